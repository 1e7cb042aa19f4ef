//! Data models for items, recipes and market prices

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Trading post prices are quoted in copper; results are reported in gold
pub const COPPER_PER_GOLD: f64 = 10_000.0;

/// Whether an identifier refers to a tradable item or a wallet currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemKind {
    Item,
    Currency,
}

/// Cache key for a node: the same numeric id may exist as both item and currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: u32,
}

impl ItemRef {
    pub fn item(id: u32) -> Self {
        Self {
            kind: ItemKind::Item,
            id,
        }
    }

    pub fn currency(id: u32) -> Self {
        Self {
            kind: ItemKind::Currency,
            id,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ItemKind::Item => write!(f, "item {}", self.id),
            ItemKind::Currency => write!(f, "currency {}", self.id),
        }
    }
}

/// Ingredient type as reported by the recipe endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum IngredientKind {
    Item,
    Currency,
    GuildUpgrade,
    #[serde(other)]
    Other,
}

impl IngredientKind {
    /// Only items and currencies take part in cost resolution
    pub fn item_kind(&self) -> Option<ItemKind> {
        match self {
            IngredientKind::Item => Some(ItemKind::Item),
            IngredientKind::Currency => Some(ItemKind::Currency),
            IngredientKind::GuildUpgrade | IngredientKind::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientKind::Item => "Item",
            IngredientKind::Currency => "Currency",
            IngredientKind::GuildUpgrade => "GuildUpgrade",
            IngredientKind::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Item" => IngredientKind::Item,
            "Currency" => IngredientKind::Currency,
            "GuildUpgrade" => IngredientKind::GuildUpgrade,
            _ => IngredientKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ingredient {
    #[serde(rename = "type")]
    pub kind: IngredientKind,
    pub id: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recipe {
    pub id: u32,
    #[serde(default = "default_output_count")]
    pub output_item_count: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

fn default_output_count() -> u32 {
    1
}

impl Recipe {
    /// Items produced per craft, never zero
    pub fn output_count(&self) -> u32 {
        self.output_item_count.max(1)
    }
}

/// One side of the trading post order book, in copper
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Offer {
    pub quantity: u64,
    pub unit_price: u64,
}

/// Snapshot from the commerce prices endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MarketListing {
    #[serde(default)]
    pub buys: Option<Offer>,
    #[serde(default)]
    pub sells: Option<Offer>,
}

/// Resolved price information for a node, in gold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    /// Highest buy order, or the sell price when no buy order price is set
    pub price: f64,
    /// Lowest sell listing
    pub instant: Option<f64>,
    pub volume: Option<u64>,
}

impl Quote {
    pub fn fixed(price: f64) -> Self {
        Self {
            price,
            instant: None,
            volume: None,
        }
    }
}

/// Profit margins after the trading post tax
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profit {
    /// Selling at the instant price
    pub margin: f64,
    /// Selling at the buy order price
    pub margin_insta: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub name: String,
    pub amount_needed: f64,
    pub unit_price: Option<f64>,
    pub total_cost: Option<f64>,
}

/// Flattened base ingredients needed for one unit of an item
pub type Ledger = BTreeMap<ItemRef, LedgerEntry>;
