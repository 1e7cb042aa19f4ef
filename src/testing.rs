//! Test doubles for the lookup and prompt seams

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, Once};

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};
use crate::models::{Ingredient, IngredientKind, MarketListing, Offer, Recipe};
use crate::prompt::PricePrompt;
use crate::source::DataSource;

static INIT_LOGGING: Once = Once::new();

/// Route tracing output to the test writer when `RUST_LOG` is set
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Shared in-memory sink for formatted log lines
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return what it logged
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_writer(move || writer.clone())
        .finish();

    let value = tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().unwrap().clone();
    (value, String::from_utf8_lossy(&bytes).into_owned())
}

pub fn item(id: u32, count: u32) -> Ingredient {
    Ingredient {
        kind: IngredientKind::Item,
        id,
        count,
    }
}

pub fn currency(id: u32, count: u32) -> Ingredient {
    Ingredient {
        kind: IngredientKind::Currency,
        id,
        count,
    }
}

pub fn guild_upgrade(id: u32, count: u32) -> Ingredient {
    Ingredient {
        kind: IngredientKind::GuildUpgrade,
        id,
        count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    ItemName(u32),
    CurrencyName(u32),
    SearchRecipes(u32),
    Recipe(u32),
    MarketListing(u32),
}

/// In-memory lookups that record every call
#[derive(Default)]
pub struct MockSource {
    items: HashMap<u32, String>,
    currencies: HashMap<u32, String>,
    searches: HashMap<u32, Vec<u32>>,
    recipes: HashMap<u32, Recipe>,
    prices: HashMap<u32, MarketListing>,
    failing_prices: HashSet<u32>,
    calls: RefCell<Vec<Lookup>>,
}

impl MockSource {
    pub const BUY_QUANTITY: u64 = 100;
    pub const SELL_QUANTITY: u64 = 250;

    pub fn new() -> Self {
        init_test_logging();
        Self::default()
    }

    pub fn with_item(mut self, id: u32, name: &str) -> Self {
        self.items.insert(id, name.to_string());
        self
    }

    pub fn with_currency(mut self, id: u32, name: &str) -> Self {
        self.currencies.insert(id, name.to_string());
        self
    }

    pub fn with_search(mut self, output_item_id: u32, recipe_ids: Vec<u32>) -> Self {
        self.searches.insert(output_item_id, recipe_ids);
        self
    }

    pub fn with_recipe_record(
        mut self,
        recipe_id: u32,
        output_item_count: u32,
        ingredients: Vec<Ingredient>,
    ) -> Self {
        self.recipes.insert(
            recipe_id,
            Recipe {
                id: recipe_id,
                output_item_count,
                ingredients,
            },
        );
        self
    }

    /// Register a recipe and make it the search result for its output
    pub fn with_recipe(
        self,
        output_item_id: u32,
        recipe_id: u32,
        output_item_count: u32,
        ingredients: Vec<Ingredient>,
    ) -> Self {
        self.with_search(output_item_id, vec![recipe_id])
            .with_recipe_record(recipe_id, output_item_count, ingredients)
    }

    /// Buy and sell unit prices in copper
    pub fn with_price(self, item_id: u32, buy: u64, sell: u64) -> Self {
        self.with_listing(
            item_id,
            MarketListing {
                buys: Some(Offer {
                    quantity: Self::BUY_QUANTITY,
                    unit_price: buy,
                }),
                sells: Some(Offer {
                    quantity: Self::SELL_QUANTITY,
                    unit_price: sell,
                }),
            },
        )
    }

    pub fn with_listing(mut self, item_id: u32, listing: MarketListing) -> Self {
        self.prices.insert(item_id, listing);
        self
    }

    /// Price lookups for `item_id` fail with a server error
    pub fn with_failing_price(mut self, item_id: u32) -> Self {
        self.failing_prices.insert(item_id);
        self
    }

    pub fn calls(&self) -> Vec<Lookup> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, lookup: Lookup) -> usize {
        self.calls.borrow().iter().filter(|c| **c == lookup).count()
    }

    fn record(&self, lookup: Lookup) {
        self.calls.borrow_mut().push(lookup);
    }
}

impl DataSource for MockSource {
    fn item_name(&self, item_id: u32) -> Result<Option<String>> {
        self.record(Lookup::ItemName(item_id));
        Ok(self.items.get(&item_id).cloned())
    }

    fn currency_name(&self, currency_id: u32) -> Result<Option<String>> {
        self.record(Lookup::CurrencyName(currency_id));
        Ok(self.currencies.get(&currency_id).cloned())
    }

    fn search_recipes(&self, output_item_id: u32) -> Result<Vec<u32>> {
        self.record(Lookup::SearchRecipes(output_item_id));
        Ok(self
            .searches
            .get(&output_item_id)
            .cloned()
            .unwrap_or_default())
    }

    fn recipe(&self, recipe_id: u32) -> Result<Option<Recipe>> {
        self.record(Lookup::Recipe(recipe_id));
        Ok(self.recipes.get(&recipe_id).cloned())
    }

    fn market_listing(&self, item_id: u32) -> Result<Option<MarketListing>> {
        self.record(Lookup::MarketListing(item_id));
        if self.failing_prices.contains(&item_id) {
            return Err(Error::Status {
                url: format!("mock://commerce/prices/{}", item_id),
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(self.prices.get(&item_id).cloned())
    }
}

/// Answers every prompt with the same copper value
pub struct FixedPrompt {
    copper: Option<f64>,
    asked: Cell<usize>,
}

impl FixedPrompt {
    pub fn new(copper: f64) -> Self {
        Self {
            copper: Some(copper),
            asked: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            copper: None,
            asked: Cell::new(0),
        }
    }

    pub fn times_asked(&self) -> usize {
        self.asked.get()
    }
}

impl PricePrompt for FixedPrompt {
    fn ask(&self, _name: &str, _currency_id: u32) -> Result<f64> {
        self.asked.set(self.asked.get() + 1);
        self.copper
            .ok_or_else(|| Error::Prompt("no input".to_string()))
    }
}
