//! Crafting cost calculator logic

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{ItemRef, Ledger, LedgerEntry, Profit};
use crate::resolver::{Field, ItemCache, Node, Resolver};

/// Trading post fee taken from every sale
pub const MARKET_TAX_RATE: f64 = 0.15;

/// Flatten the recipe tree of `root` into the base ingredients needed for one unit.
///
/// Quantities multiply along each path from the root, and a base ingredient
/// reached through several branches is summed into one entry.
pub fn get_raw_ingredients(resolver: &mut Resolver<'_>, root: ItemRef) -> Result<Ledger> {
    let mut walk = Flattening {
        ledger: Ledger::new(),
        path: vec![root],
    };
    walk.descend(resolver, root, 1.0)?;
    Ok(walk.ledger)
}

struct Flattening {
    ledger: Ledger,
    /// Items on the current descent, root first
    path: Vec<ItemRef>,
}

impl Flattening {
    fn descend(
        &mut self,
        resolver: &mut Resolver<'_>,
        parent: ItemRef,
        multiplier: f64,
    ) -> Result<()> {
        for (child, quantity) in resolver.children(parent) {
            let node = resolver.resolve_for_recursion(child)?;
            let amount = quantity * multiplier;

            if !node.is_leaf() {
                if self.path.contains(&child) {
                    return Err(Error::CyclicRecipe(child));
                }
                self.path.push(child);
                self.descend(resolver, child, amount)?;
                self.path.pop();
                continue;
            }

            let name = node.display_name();
            let unit_price = node.price();
            debug!("Adding {} x {} to the ledger of {}", amount, name, self.path[0]);

            self.ledger
                .entry(child)
                .and_modify(|entry| entry.amount_needed += amount)
                .or_insert(LedgerEntry {
                    name,
                    amount_needed: amount,
                    unit_price,
                    total_cost: None,
                });
        }
        Ok(())
    }
}

/// Sum the cost of every ledger entry with a known price.
///
/// Entries without a price are left out of the total. Zero-priced entries are
/// counted but reported, since they usually hide an account bound ingredient.
pub fn calculate_crafting_cost(node: &mut Node) -> Result<f64> {
    let item = node.item;
    let item_name = node.display_name();
    let Some(ledger) = raw_ingredients_mut(node) else {
        return Err(Error::InvalidState {
            item,
            reason: "raw ingredients have not been resolved",
        });
    };

    let mut cost = 0.0;
    for entry in ledger.values_mut() {
        let Some(unit_price) = entry.unit_price else {
            debug!("Skipping {} with unknown price", entry.name);
            continue;
        };
        if unit_price == 0.0 {
            warn!(
                "{} has {} as an ingredient with no price, it is likely account bound and is not reflected in the profit margin",
                item_name, entry.name
            );
        }

        let total = entry.amount_needed * unit_price;
        entry.total_cost = Some(total);
        cost += total;
    }

    debug!("Crafting cost for {} is {:.4} gold", item_name, cost);
    node.crafting_cost = Field::Fetched(cost);
    Ok(cost)
}

fn raw_ingredients_mut(node: &mut Node) -> Option<&mut Ledger> {
    match &mut node.raw_ingredients {
        Field::Fetched(ledger) => Some(ledger),
        Field::Unfetched => None,
    }
}

/// Profit after tax when selling at the buy order price and at the instant price
pub fn calculate_profit_margin(node: &mut Node) -> Result<Profit> {
    let invalid = |reason| Error::InvalidState {
        item: node.item,
        reason,
    };

    let quote = *node
        .quote
        .get()
        .ok_or_else(|| invalid("price has not been fetched"))?;
    let instant = quote
        .instant
        .ok_or_else(|| invalid("instant price is not available"))?;
    let cost = *node
        .crafting_cost
        .get()
        .ok_or_else(|| invalid("crafting cost has not been computed"))?;

    let keep = 1.0 - MARKET_TAX_RATE;
    let profit = Profit {
        margin_insta: quote.price * keep - cost,
        margin: instant * keep - cost,
    };

    debug!(
        "Profit margin for {} is {:.4} gold per item",
        node.display_name(),
        profit.margin
    );
    node.profit = Field::Fetched(profit);
    Ok(profit)
}

/// Summary figures used to compare what is worth crafting
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub item_name: String,
    pub item_id: u32,
    pub total_raw_resources: f64,
    pub profit_margin: f64,
    pub profit_per_raw: f64,
    pub profit_margin_insta: f64,
    pub profit_per_raw_insta: f64,
    pub crafting_cost: f64,
    pub price_sell: f64,
    /// Spread between buy orders and sell listings, as a fraction of the sell price
    pub gap: f64,
    pub volume: Option<u64>,
}

/// Fully resolve `item` and derive its analysis metrics
pub fn get_analysis_metrics(resolver: &mut Resolver<'_>, item: ItemRef) -> Result<Metrics> {
    let node = resolver.resolve_full(item)?;
    metrics_for(node)
}

fn metrics_for(node: &Node) -> Result<Metrics> {
    let invalid = |reason| Error::InvalidState {
        item: node.item,
        reason,
    };
    let ledger = node
        .raw_ingredients
        .get()
        .ok_or_else(|| invalid("raw ingredients have not been resolved"))?;
    let quote = node
        .quote
        .get()
        .ok_or_else(|| invalid("price has not been fetched"))?;
    let profit = node
        .profit
        .get()
        .ok_or_else(|| invalid("profit has not been computed"))?;
    let crafting_cost = *node
        .crafting_cost
        .get()
        .ok_or_else(|| invalid("crafting cost has not been computed"))?;
    let price_sell = quote
        .instant
        .ok_or_else(|| invalid("instant price is not available"))?;

    let total_raw_resources: f64 = ledger.values().map(|e| e.amount_needed).sum();
    let per_raw = |margin: f64| {
        if total_raw_resources != 0.0 {
            margin / total_raw_resources
        } else {
            0.0
        }
    };
    let gap = if price_sell != 0.0 {
        1.0 - quote.price / price_sell
    } else {
        0.0
    };

    Ok(Metrics {
        item_name: node.display_name(),
        item_id: node.item.id,
        total_raw_resources,
        profit_margin: profit.margin,
        profit_per_raw: per_raw(profit.margin),
        profit_margin_insta: profit.margin_insta,
        profit_per_raw_insta: per_raw(profit.margin_insta),
        crafting_cost,
        price_sell,
        gap,
        volume: quote.volume,
    })
}

/// Format the cached recipe tree of `item` as a readable string
pub fn format_recipe_tree(resolver: &Resolver<'_>, item: ItemRef) -> String {
    let mut output = String::new();
    let mut path = Vec::new();
    write_tree(resolver.cache(), item, 1.0, 0, &mut path, &mut output);
    output
}

fn write_tree(
    cache: &ItemCache,
    item: ItemRef,
    quantity: f64,
    indent: usize,
    path: &mut Vec<ItemRef>,
    output: &mut String,
) {
    let prefix = "  ".repeat(indent);

    let Some(node) = cache.get(item) else {
        output.push_str(&format!("{}{:.2}x {} (unresolved)\n", prefix, quantity, item));
        return;
    };

    if node.is_leaf() {
        let price_str = match node.price() {
            Some(price) => format!("{:.4} g each", price),
            None => "price unknown".to_string(),
        };
        output.push_str(&format!(
            "{}{:.2}x {} ({})\n",
            prefix,
            quantity,
            node.display_name(),
            price_str
        ));
        return;
    }

    output.push_str(&format!("{}{:.2}x {}\n", prefix, quantity, node.display_name()));
    if path.contains(&item) {
        output.push_str(&format!("{}  (cycle)\n", prefix));
        return;
    }

    path.push(item);
    for (child, child_quantity) in node.children.get().into_iter().flatten() {
        write_tree(cache, *child, *child_quantity, indent + 1, path, output);
    }
    path.pop();
}

/// Format a ledger as one line per base ingredient
pub fn format_ledger(ledger: &Ledger) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<36} {:>10} {:>12} {:>12}\n",
        "Ingredient", "Amount", "Unit (g)", "Total (g)"
    ));
    output.push_str(&format!("{}\n", "-".repeat(73)));

    for entry in ledger.values() {
        let unit = entry
            .unit_price
            .map_or_else(|| "-".to_string(), |p| format!("{:.4}", p));
        let total = entry
            .total_cost
            .map_or_else(|| "-".to_string(), |c| format!("{:.4}", c));
        output.push_str(&format!(
            "{:<36} {:>10.2} {:>12} {:>12}\n",
            entry.name, entry.amount_needed, unit, total
        ));
    }
    output
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Crafting Analysis ===")?;
        writeln!(f, "Item: {} ({})", self.item_name, self.item_id)?;
        writeln!(f)?;

        writeln!(f, "Crafting cost:        {:.4} g", self.crafting_cost)?;
        writeln!(f, "Sell price:           {:.4} g", self.price_sell)?;
        writeln!(f, "Buy/sell gap:         {:.1}%", self.gap * 100.0)?;
        match self.volume {
            Some(volume) => writeln!(f, "Volume:               {}", volume)?,
            None => writeln!(f, "Volume:               unknown")?,
        }
        writeln!(f)?;

        writeln!(f, "Profit (sell listing): {:.4} g", self.profit_margin)?;
        writeln!(f, "Profit (buy order):    {:.4} g", self.profit_margin_insta)?;
        writeln!(f)?;

        writeln!(f, "Raw resources:        {:.2}", self.total_raw_resources)?;
        writeln!(f, "  Profit per raw:      {:.4} g", self.profit_per_raw)?;
        writeln!(f, "  Profit per raw (bo): {:.4} g", self.profit_per_raw_insta)?;

        Ok(())
    }
}
