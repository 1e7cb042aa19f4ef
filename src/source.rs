//! Lookups the resolver needs from the outside world

use crate::error::Result;
use crate::models::{MarketListing, Recipe};

/// Item, recipe and price lookups.
///
/// A missing record is `Ok(None)` (or an empty search result); only transport,
/// server and storage failures are errors.
pub trait DataSource {
    fn item_name(&self, item_id: u32) -> Result<Option<String>>;

    fn currency_name(&self, currency_id: u32) -> Result<Option<String>>;

    /// Ids of recipes producing `output_item_id`, in source order
    fn search_recipes(&self, output_item_id: u32) -> Result<Vec<u32>>;

    fn recipe(&self, recipe_id: u32) -> Result<Option<Recipe>>;

    fn market_listing(&self, item_id: u32) -> Result<Option<MarketListing>>;
}
