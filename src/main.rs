//! Crafting Cost Calculator
//!
//! Crafting cost and profit analysis for Guild Wars 2 recipes.

mod api;
mod calculator;
mod config;
mod db;
mod error;
mod models;
mod prompt;
mod resolver;
mod source;
#[cfg(test)]
mod testing;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::api::ApiSource;
use crate::config::Config;
use crate::db::SqliteSource;
use crate::models::{COPPER_PER_GOLD, ItemRef};
use crate::prompt::StdinPrompt;
use crate::resolver::Resolver;
use crate::source::DataSource;

#[derive(Parser)]
#[command(name = "craftcost")]
#[command(about = "Crafting cost and profit calculator for Guild Wars 2")]
struct Cli {
    /// Path to the SQLite database used for offline lookups
    #[arg(short, long, default_value = "craftcost.db")]
    database: PathBuf,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging; Research Notes are priced at zero instead of prompting
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse crafting cost and profit of one or more items
    Analyze {
        /// Item ids to analyse
        #[arg(required = true)]
        item_ids: Vec<u32>,

        /// Answer lookups from the database instead of the API
        #[arg(long)]
        offline: bool,

        /// Show the resolved recipe tree
        #[arg(short, long)]
        verbose: bool,
    },

    /// List all items in the database
    ListItems,

    /// Initialize empty database with schema
    Init,

    /// Load sample data for offline analysis
    LoadSample,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.debug |= cli.debug;
    init_logging(config.debug);

    let conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Analyze {
            item_ids,
            offline,
            verbose,
        } => {
            let api;
            let sqlite;
            let source: &dyn DataSource = if offline {
                sqlite = SqliteSource::new(&conn);
                &sqlite
            } else {
                api = ApiSource::new(&config);
                &api
            };
            let prompt = StdinPrompt;
            let mut resolver = Resolver::new(source, &prompt, &config);

            for item_id in item_ids {
                let item = ItemRef::item(item_id);
                let metrics = calculator::get_analysis_metrics(&mut resolver, item)?;

                if verbose {
                    println!("Recipe tree:\n");
                    println!("{}", calculator::format_recipe_tree(&resolver, item));
                }

                println!("{}", metrics);
                if let Some(ledger) = resolver
                    .node(item)
                    .and_then(|n| n.raw_ingredients.get())
                {
                    println!("{}", calculator::format_ledger(ledger));
                }
            }
            debug!("{} items resolved", resolver.cache().len());
        }

        Commands::ListItems => {
            let items = db::list_items(&conn)?;
            if items.is_empty() {
                println!("No items in database. Run 'load-sample' first.");
            } else {
                println!("{:>8} {:<36} {:>12}", "Id", "Item", "Buy (g)");
                println!("{}", "-".repeat(58));
                for (id, name, buy) in items {
                    let buy = buy.map_or_else(
                        || "-".to_string(),
                        |copper| format!("{:.4}", copper as f64 / COPPER_PER_GOLD),
                    );
                    println!("{:>8} {:<36} {:>12}", id, name, buy);
                }
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

/// Load a small recipe and price set for offline analysis
fn load_sample_data(conn: &Connection) -> Result<()> {
    use crate::models::{Ingredient, IngredientKind, MarketListing, Offer, Recipe};

    db::clear_data(conn)?;

    let items = [
        (19700, "Mithril Ore"),
        (19684, "Mithril Ingot"),
        (19722, "Elder Wood Log"),
        (19709, "Elder Wood Plank"),
        (19721, "Glob of Ectoplasm"),
        (46742, "Lump of Mithrillium"),
    ];
    for (id, name) in items {
        db::upsert_item(conn, id, name)?;
    }
    db::upsert_currency(conn, 23, "Spirit Shard")?;
    db::upsert_currency(conn, 61, "Research Note")?;

    let ingredient = |kind, id, count| Ingredient { kind, id, count };

    // Mithril Ingot: 2 Mithril Ore
    db::upsert_recipe(
        conn,
        19684,
        &Recipe {
            id: 19,
            output_item_count: 1,
            ingredients: vec![ingredient(IngredientKind::Item, 19700, 2)],
        },
    )?;

    // Elder Wood Plank: 3 Elder Wood Logs
    db::upsert_recipe(
        conn,
        19709,
        &Recipe {
            id: 20,
            output_item_count: 1,
            ingredients: vec![ingredient(IngredientKind::Item, 19722, 3)],
        },
    )?;

    // Lump of Mithrillium: 3 ingots, 1 plank, 1 ecto and a Spirit Shard
    db::upsert_recipe(
        conn,
        46742,
        &Recipe {
            id: 7319,
            output_item_count: 1,
            ingredients: vec![
                ingredient(IngredientKind::Item, 19684, 3),
                ingredient(IngredientKind::Item, 19709, 1),
                ingredient(IngredientKind::Item, 19721, 1),
                ingredient(IngredientKind::Currency, 23, 1),
            ],
        },
    )?;

    let prices = [
        (19700, 60, 1000, 65, 2000),
        (19684, 150, 400, 160, 900),
        (19722, 30, 5000, 35, 8000),
        (19709, 110, 300, 120, 700),
        (19721, 2500, 20000, 2600, 15000),
        (46742, 9000, 50, 10000, 80),
    ];
    for (id, buy, buy_quantity, sell, sell_quantity) in prices {
        db::upsert_price(
            conn,
            id,
            &MarketListing {
                buys: Some(Offer {
                    quantity: buy_quantity,
                    unit_price: buy,
                }),
                sells: Some(Offer {
                    quantity: sell_quantity,
                    unit_price: sell,
                }),
            },
        )?;
    }

    println!("Loaded {} sample items", items.len());
    Ok(())
}
