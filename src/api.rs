//! Guild Wars 2 API client
//!
//! Blocking lookups against the public `/v2` endpoints. A 404 response is the
//! API's "no such id" answer and maps to `None`; every other non-200 status
//! aborts the lookup.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{MarketListing, Recipe};
use crate::source::DataSource;

#[derive(Debug, Deserialize)]
struct NamedRecord {
    name: String,
}

pub struct ApiSource {
    base_url: String,
    lang: String,
    agent: ureq::Agent,
}

impl ApiSource {
    pub fn new(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            base_url: config.api_base.trim_end_matches('/').to_string(),
            lang: config.lang.clone(),
            agent,
        }
    }

    /// GET `url` and decode JSON, or `None` on 404
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        debug!("GET {}", url);
        match self.agent.get(url).call() {
            Ok(response) => response.into_json().map(Some).map_err(|source| Error::Decode {
                url: url.to_string(),
                source,
            }),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(status, response)) => Err(Error::Status {
                url: url.to_string(),
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(transport)) => Err(Error::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            }),
        }
    }
}

impl DataSource for ApiSource {
    fn item_name(&self, item_id: u32) -> Result<Option<String>> {
        let url = format!("{}/items/{}?lang={}", self.base_url, item_id, self.lang);
        let record: Option<NamedRecord> = self.get_json(&url)?;
        Ok(record.map(|r| r.name))
    }

    fn currency_name(&self, currency_id: u32) -> Result<Option<String>> {
        let url = format!(
            "{}/currencies?ids={}&lang={}",
            self.base_url, currency_id, self.lang
        );
        let records: Option<Vec<NamedRecord>> = self.get_json(&url)?;
        Ok(records.and_then(|r| r.into_iter().next()).map(|r| r.name))
    }

    fn search_recipes(&self, output_item_id: u32) -> Result<Vec<u32>> {
        let url = format!(
            "{}/recipes/search?output={}",
            self.base_url, output_item_id
        );
        let ids: Option<Vec<u32>> = self.get_json(&url)?;
        Ok(ids.unwrap_or_default())
    }

    fn recipe(&self, recipe_id: u32) -> Result<Option<Recipe>> {
        let url = format!(
            "{}/recipes?ids={}&v=latest&lang={}",
            self.base_url, recipe_id, self.lang
        );
        let recipes: Option<Vec<Recipe>> = self.get_json(&url)?;
        Ok(recipes.and_then(|r| r.into_iter().next()))
    }

    fn market_listing(&self, item_id: u32) -> Result<Option<MarketListing>> {
        let url = format!("{}/commerce/prices/{}", self.base_url, item_id);
        self.get_json(&url)
    }
}
