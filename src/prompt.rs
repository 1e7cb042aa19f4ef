//! Manually entered prices for currencies without a market

use std::io::{self, BufRead, Write};

use crate::error::{Error, Result};

pub trait PricePrompt {
    /// Price of one unit of `currency_id`, in copper
    fn ask(&self, name: &str, currency_id: u32) -> Result<f64>;
}

/// Reads the price from standard input
pub struct StdinPrompt;

impl PricePrompt for StdinPrompt {
    fn ask(&self, name: &str, currency_id: u32) -> Result<f64> {
        print!("Enter the price per {} (currency {}) in copper: ", name, currency_id);
        io::stdout()
            .flush()
            .map_err(|e| Error::Prompt(e.to_string()))?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::Prompt(e.to_string()))?;

        parse_price(&line)
    }
}

fn parse_price(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| Error::Prompt(format!("'{}' is not a number", trimmed)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Prompt(format!("'{}' is not a valid price", trimmed)));
    }
    Ok(value)
}
