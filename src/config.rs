//! Runtime configuration: endpoint, recipe overrides and manual pricing

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_API_BASE: &str = "https://api.guildwars2.com/v2";

/// Research Notes have no market; their price must be entered by hand
pub const RESEARCH_NOTE_CURRENCY_ID: u32 = 61;

/// Items whose recipe search returns the wrong recipe (or none at all)
const BUILTIN_RECIPE_OVERRIDES: &[(u32, u32)] = &[
    (97339, 13584),  // Core tier 1
    (97041, 13542),  // Core tier 2
    (97284, 13550),  // Core tier 3
    (96628, 13821),  // Core tier 4
    (95864, 13658),  // Core tier 5
    (96467, 13723),  // Core tier 6
    (97020, 13751),  // Core tier 7
    (96299, 13780),  // Core tier 8
    (96070, 13841),  // Core tier 9
    (96613, 13628),  // Core tier 10
    (100941, 14018), // Rare Rift Motivation
    (100364, 14029), // Masterwork Rift Motivation
    (100060, 13957), // Fine Rift Motivation
    (97487, 13839),  // Piece of Dragon Jade
];

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub lang: String,
    pub timeout_secs: u64,
    pub manual_price_currency: u32,
    /// Skips the manual price prompt (priced at zero) and enables debug logging
    pub debug: bool,
    pub recipe_overrides: BTreeMap<u32, u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            lang: "en".to_string(),
            timeout_secs: 30,
            manual_price_currency: RESEARCH_NOTE_CURRENCY_ID,
            debug: false,
            recipe_overrides: BUILTIN_RECIPE_OVERRIDES.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    api_base: Option<String>,
    lang: Option<String>,
    timeout_secs: Option<u64>,
    manual_price_currency: Option<u32>,
    debug: Option<bool>,
    recipe_overrides: Vec<RecipeOverride>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipeOverride {
    item: u32,
    recipe: u32,
}

impl Config {
    /// Load defaults, then apply the TOML file at `path` if one is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = path {
            let content = fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
            config.merge_toml(&content)?;
        }
        Ok(config)
    }

    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;

        if let Some(api_base) = file.api_base {
            self.api_base = api_base.trim_end_matches('/').to_string();
        }
        if let Some(lang) = file.lang {
            self.lang = lang;
        }
        if let Some(timeout_secs) = file.timeout_secs {
            if timeout_secs == 0 {
                return Err(Error::Config("timeout_secs must be positive".to_string()));
            }
            self.timeout_secs = timeout_secs;
        }
        if let Some(currency) = file.manual_price_currency {
            self.manual_price_currency = currency;
        }
        if let Some(debug) = file.debug {
            self.debug = debug;
        }
        for entry in file.recipe_overrides {
            self.recipe_overrides.insert(entry.item, entry.recipe);
        }
        Ok(())
    }

    pub fn recipe_override(&self, item_id: u32) -> Option<u32> {
        self.recipe_overrides.get(&item_id).copied()
    }
}
