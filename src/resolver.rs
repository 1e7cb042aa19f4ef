//! Ingredient resolution
//!
//! Builds the recipe tree of an item on demand. Every node lives in an
//! [`ItemCache`] keyed by [`ItemRef`], so an item that appears in several
//! branches (or under several analysed roots) is fetched once and shared.
//! Node fields are filled lazily and each one is fetched at most once.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::calculator;
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    COPPER_PER_GOLD, ItemKind, ItemRef, Ledger, MarketListing, Profit, Quote, Recipe,
};
use crate::prompt::PricePrompt;
use crate::source::DataSource;

/// Lazily populated value. `Fetched(None)` records a lookup that found nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Unfetched,
    Fetched(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unfetched
    }
}

impl<T> Field<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Field::Unfetched => None,
            Field::Fetched(value) => Some(value),
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, Field::Fetched(_))
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub item: ItemRef,
    pub name: Field<Option<String>>,
    pub recipe_id: Field<Option<u32>>,
    pub recipe: Field<Option<Recipe>>,
    /// Direct ingredients and the quantity needed per crafted unit
    pub children: Field<Vec<(ItemRef, f64)>>,
    pub quote: Field<Quote>,
    pub raw_ingredients: Field<Ledger>,
    pub crafting_cost: Field<f64>,
    pub profit: Field<Profit>,
}

impl Node {
    pub fn new(item: ItemRef) -> Self {
        Self {
            item,
            name: Field::Unfetched,
            recipe_id: Field::Unfetched,
            recipe: Field::Unfetched,
            children: Field::Unfetched,
            quote: Field::Unfetched,
            raw_ingredients: Field::Unfetched,
            crafting_cost: Field::Unfetched,
            profit: Field::Unfetched,
        }
    }

    pub fn display_name(&self) -> String {
        match self.name.get() {
            Some(Some(name)) => name.clone(),
            _ => self.item.to_string(),
        }
    }

    /// Base ingredient: nothing to break it down into
    pub fn is_leaf(&self) -> bool {
        self.children.get().is_none_or(|c| c.is_empty())
    }

    pub fn price(&self) -> Option<f64> {
        self.quote.get().map(|q| q.price)
    }
}

/// Every node resolved during a run, at most one per item reference
#[derive(Debug, Default)]
pub struct ItemCache {
    nodes: HashMap<ItemRef, Node>,
}

impl ItemCache {
    pub fn get(&self, item: ItemRef) -> Option<&Node> {
        self.nodes.get(&item)
    }

    pub fn contains(&self, item: ItemRef) -> bool {
        self.nodes.contains_key(&item)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    fn entry(&mut self, item: ItemRef) -> &mut Node {
        self.nodes.entry(item).or_insert_with(|| Node::new(item))
    }
}

pub struct Resolver<'a> {
    source: &'a dyn DataSource,
    prompt: &'a dyn PricePrompt,
    config: &'a Config,
    cache: ItemCache,
}

impl<'a> Resolver<'a> {
    pub fn new(
        source: &'a dyn DataSource,
        prompt: &'a dyn PricePrompt,
        config: &'a Config,
    ) -> Self {
        Self {
            source,
            prompt,
            config,
            cache: ItemCache::default(),
        }
    }

    pub fn cache(&self) -> &ItemCache {
        &self.cache
    }

    pub fn node(&self, item: ItemRef) -> Option<&Node> {
        self.cache.get(item)
    }

    /// Direct ingredients of `item` as currently cached
    pub fn children(&self, item: ItemRef) -> Vec<(ItemRef, f64)> {
        self.cache
            .get(item)
            .and_then(|node| node.children.get())
            .cloned()
            .unwrap_or_default()
    }

    /// Populate everything needed to analyse `item`, including its flattened
    /// ingredient ledger, crafting cost and profit margins.
    pub fn resolve_full(&mut self, item: ItemRef) -> Result<&Node> {
        self.ensure_name(item)?;
        self.ensure_children(item)?;

        if !self.cache.entry(item).raw_ingredients.is_fetched() {
            let ledger = calculator::get_raw_ingredients(self, item)?;
            self.cache.entry(item).raw_ingredients = Field::Fetched(ledger);
        }

        self.ensure_quote(item)?;

        let node = self.cache.entry(item);
        if !node.crafting_cost.is_fetched() {
            calculator::calculate_crafting_cost(node)?;
        }
        if !node.profit.is_fetched() {
            calculator::calculate_profit_margin(node)?;
        }
        Ok(&*node)
    }

    /// Populate what is needed when `item` appears as another item's ingredient.
    ///
    /// Currencies only get a name and price. Items get their recipe and direct
    /// children; only base items are priced, since intermediate items are
    /// costed through their own ingredients.
    pub fn resolve_for_recursion(&mut self, item: ItemRef) -> Result<&Node> {
        self.ensure_name(item)?;
        match item.kind {
            ItemKind::Currency => self.ensure_quote(item)?,
            ItemKind::Item => {
                self.ensure_children(item)?;
                if self.cache.entry(item).is_leaf() {
                    self.ensure_quote(item)?;
                }
            }
        }
        Ok(&*self.cache.entry(item))
    }

    fn ensure_name(&mut self, item: ItemRef) -> Result<()> {
        if self.cache.entry(item).name.is_fetched() {
            return Ok(());
        }

        let name = match item.kind {
            ItemKind::Item => self.source.item_name(item.id)?,
            ItemKind::Currency => self.source.currency_name(item.id)?,
        };
        match &name {
            Some(name) => debug!("Name for {} is {}", item, name),
            None => warn!("No name found for {}", item),
        }

        self.cache.entry(item).name = Field::Fetched(name);
        Ok(())
    }

    fn ensure_recipe_id(&mut self, item: ItemRef) -> Result<()> {
        if self.cache.entry(item).recipe_id.is_fetched() {
            return Ok(());
        }

        let recipe_id = match item.kind {
            ItemKind::Currency => None,
            ItemKind::Item => match self.config.recipe_override(item.id) {
                Some(recipe_id) => {
                    debug!("Using override recipe {} for {}", recipe_id, item);
                    Some(recipe_id)
                }
                None => self.source.search_recipes(item.id)?.first().copied(),
            },
        };
        debug!("Recipe id for {} is {:?}", item, recipe_id);

        self.cache.entry(item).recipe_id = Field::Fetched(recipe_id);
        Ok(())
    }

    fn ensure_recipe(&mut self, item: ItemRef) -> Result<()> {
        self.ensure_recipe_id(item)?;

        let node = self.cache.entry(item);
        if node.recipe.is_fetched() {
            return Ok(());
        }

        let recipe = match node.recipe_id.get().copied().flatten() {
            Some(recipe_id) => {
                let recipe = self.source.recipe(recipe_id)?;
                if recipe.is_none() {
                    warn!(
                        "Recipe {} for {} not found, treating it as a base item",
                        recipe_id, item
                    );
                }
                recipe
            }
            None => None,
        };

        self.cache.entry(item).recipe = Field::Fetched(recipe);
        Ok(())
    }

    fn ensure_children(&mut self, item: ItemRef) -> Result<()> {
        self.ensure_recipe(item)?;

        let node = self.cache.entry(item);
        if node.children.is_fetched() {
            return Ok(());
        }

        let (ingredients, output_count) = match node.recipe.get() {
            Some(Some(recipe)) => (recipe.ingredients.clone(), recipe.output_count()),
            _ => (Vec::new(), 1),
        };

        let mut children: Vec<(ItemRef, f64)> = Vec::new();
        for ingredient in ingredients {
            let Some(kind) = ingredient.kind.item_kind() else {
                debug!(
                    "Skipping {} ingredient {} of {}",
                    ingredient.kind.as_str(),
                    ingredient.id,
                    item
                );
                continue;
            };
            let child = ItemRef {
                kind,
                id: ingredient.id,
            };

            if self.cache.contains(child) {
                debug!("Reusing cached {}", child);
            } else {
                self.resolve_for_recursion(child)?;
            }

            let quantity = f64::from(ingredient.count) / f64::from(output_count);
            match children.iter_mut().find(|(existing, _)| *existing == child) {
                Some(entry) => entry.1 = quantity,
                None => children.push((child, quantity)),
            }
        }
        debug!("{} has {} direct ingredients", item, children.len());

        self.cache.entry(item).children = Field::Fetched(children);
        Ok(())
    }

    fn ensure_quote(&mut self, item: ItemRef) -> Result<()> {
        if self.cache.entry(item).quote.is_fetched() {
            return Ok(());
        }

        let quote = match item.kind {
            ItemKind::Currency => self.currency_quote(item)?,
            ItemKind::Item => {
                let listing = self.source.market_listing(item.id)?;
                market_quote(&self.cache.entry(item).display_name(), listing)
            }
        };
        debug!("Quote for {} is {:?}", item, quote);

        self.cache.entry(item).quote = Field::Fetched(quote);
        Ok(())
    }

    fn currency_quote(&mut self, item: ItemRef) -> Result<Quote> {
        if item.id != self.config.manual_price_currency {
            return Ok(Quote::fixed(0.0));
        }
        if self.config.debug {
            debug!("Debug mode, pricing {} at zero", item);
            return Ok(Quote::fixed(0.0));
        }

        self.ensure_name(item)?;
        let name = self.cache.entry(item).display_name();
        let copper = self.prompt.ask(&name, item.id)?;
        Ok(Quote::fixed(copper / COPPER_PER_GOLD))
    }
}

fn market_quote(name: &str, listing: Option<MarketListing>) -> Quote {
    let Some(MarketListing {
        buys: Some(buys),
        sells,
    }) = listing
    else {
        warn!(
            "Price not found for {}, it is likely an account bound item",
            name
        );
        return Quote::fixed(0.0);
    };

    let sells = sells.unwrap_or_default();
    let instant = sells.unit_price as f64 / COPPER_PER_GOLD;
    let price = if buys.unit_price != 0 {
        buys.unit_price as f64 / COPPER_PER_GOLD
    } else {
        instant
    };

    Quote {
        price,
        instant: Some(instant),
        volume: Some(sells.quantity + buys.quantity),
    }
}
