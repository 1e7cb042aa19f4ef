//! Error types for lookups and cost aggregation

use thiserror::Error;

use crate::models::ItemRef;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid state for {item}: {reason}")]
    InvalidState { item: ItemRef, reason: &'static str },

    #[error("recipe cycle detected at {0}")]
    CyclicRecipe(ItemRef),

    #[error("failed to read manual price: {0}")]
    Prompt(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
