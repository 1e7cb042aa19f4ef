//! Database schema and operations
//!
//! A local copy of item, recipe and price records. `SqliteSource` answers
//! resolver lookups from it so analyses can run offline.

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{Ingredient, IngredientKind, MarketListing, Offer, Recipe};
use crate::source::DataSource;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS currencies (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY,
            output_item_id INTEGER NOT NULL,
            output_item_count INTEGER NOT NULL DEFAULT 1
        );

        -- Position preserves the ingredient order of the recipe
        CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            ingredient_type TEXT NOT NULL,
            ingredient_id INTEGER NOT NULL,
            count INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, position)
        );

        -- Prices in copper; a NULL buy side means no buy orders
        CREATE TABLE IF NOT EXISTS prices (
            item_id INTEGER PRIMARY KEY,
            buy_unit_price INTEGER,
            buy_quantity INTEGER,
            sell_unit_price INTEGER,
            sell_quantity INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_output ON recipes(output_item_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace an item name
pub fn upsert_item(conn: &Connection, id: u32, name: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO items (id, name) VALUES (?1, ?2)",
        (id, name),
    )?;
    Ok(())
}

/// Insert or replace a currency name
pub fn upsert_currency(conn: &Connection, id: u32, name: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO currencies (id, name) VALUES (?1, ?2)",
        (id, name),
    )?;
    Ok(())
}

/// Insert or replace a recipe together with its ingredient list
pub fn upsert_recipe(conn: &Connection, output_item_id: u32, recipe: &Recipe) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO recipes (id, output_item_id, output_item_count)
         VALUES (?1, ?2, ?3)",
        (recipe.id, output_item_id, recipe.output_item_count),
    )?;
    conn.execute(
        "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
        [recipe.id],
    )?;
    for (position, ingredient) in recipe.ingredients.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, position, ingredient_type, ingredient_id, count)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                recipe.id,
                position as i64,
                ingredient.kind.as_str(),
                ingredient.id,
                ingredient.count,
            ),
        )?;
    }
    Ok(())
}

/// Insert or replace a market snapshot
pub fn upsert_price(conn: &Connection, item_id: u32, listing: &MarketListing) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO prices (item_id, buy_unit_price, buy_quantity, sell_unit_price, sell_quantity)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            item_id,
            listing.buys.map(|o| o.unit_price as i64),
            listing.buys.map(|o| o.quantity as i64),
            listing.sells.map(|o| o.unit_price as i64),
            listing.sells.map(|o| o.quantity as i64),
        ),
    )?;
    Ok(())
}

/// Clear all stored records
pub fn clear_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM prices;
        DELETE FROM recipe_ingredients;
        DELETE FROM recipes;
        DELETE FROM currencies;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

pub fn get_item_name(conn: &Connection, id: u32) -> Result<Option<String>> {
    let name = conn
        .query_row("SELECT name FROM items WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(name)
}

pub fn get_currency_name(conn: &Connection, id: u32) -> Result<Option<String>> {
    let name = conn
        .query_row("SELECT name FROM currencies WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(name)
}

/// Get all recipes that produce a given item, lowest id first
pub fn find_recipes_by_output(conn: &Connection, output_item_id: u32) -> Result<Vec<u32>> {
    let mut stmt =
        conn.prepare("SELECT id FROM recipes WHERE output_item_id = ?1 ORDER BY id")?;

    let rows = stmt.query_map([output_item_id], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn get_recipe(conn: &Connection, recipe_id: u32) -> Result<Option<Recipe>> {
    let output_item_count: Option<u32> = conn
        .query_row(
            "SELECT output_item_count FROM recipes WHERE id = ?1",
            [recipe_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(output_item_count) = output_item_count else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT ingredient_type, ingredient_id, count
         FROM recipe_ingredients
         WHERE recipe_id = ?1
         ORDER BY position",
    )?;

    let rows = stmt.query_map([recipe_id], |row| {
        Ok(Ingredient {
            kind: IngredientKind::parse(&row.get::<_, String>(0)?),
            id: row.get(1)?,
            count: row.get(2)?,
        })
    })?;

    let mut ingredients = Vec::new();
    for row in rows {
        ingredients.push(row?);
    }

    Ok(Some(Recipe {
        id: recipe_id,
        output_item_count,
        ingredients,
    }))
}

pub fn get_price(conn: &Connection, item_id: u32) -> Result<Option<MarketListing>> {
    let listing = conn
        .query_row(
            "SELECT buy_unit_price, buy_quantity, sell_unit_price, sell_quantity
             FROM prices WHERE item_id = ?1",
            [item_id],
            |row| {
                let offer = |price: Option<u64>, quantity: Option<u64>| {
                    price.map(|unit_price| Offer {
                        unit_price,
                        quantity: quantity.unwrap_or(0),
                    })
                };
                Ok(MarketListing {
                    buys: offer(row.get(0)?, row.get(1)?),
                    sells: offer(row.get(2)?, row.get(3)?),
                })
            },
        )
        .optional()?;
    Ok(listing)
}

/// List all items with their buy price in copper, if any
pub fn list_items(conn: &Connection) -> Result<Vec<(u32, String, Option<u64>)>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.name, p.buy_unit_price
         FROM items i
         LEFT JOIN prices p ON p.item_id = i.id
         ORDER BY i.name",
    )?;

    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Lookups served from the local database
pub struct SqliteSource<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSource<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl DataSource for SqliteSource<'_> {
    fn item_name(&self, item_id: u32) -> Result<Option<String>> {
        get_item_name(self.conn, item_id)
    }

    fn currency_name(&self, currency_id: u32) -> Result<Option<String>> {
        get_currency_name(self.conn, currency_id)
    }

    fn search_recipes(&self, output_item_id: u32) -> Result<Vec<u32>> {
        find_recipes_by_output(self.conn, output_item_id)
    }

    fn recipe(&self, recipe_id: u32) -> Result<Option<Recipe>> {
        get_recipe(self.conn, recipe_id)
    }

    fn market_listing(&self, item_id: u32) -> Result<Option<MarketListing>> {
        get_price(self.conn, item_id)
    }
}
