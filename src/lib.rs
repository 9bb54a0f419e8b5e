#![deny(rust_2018_idioms)]

pub mod config;
pub use config::Config;

pub mod date;
pub mod discover;
pub mod encoding;
pub mod normalize;
pub mod table;

pub mod reconcile;
pub use reconcile::function::reconcile;

pub mod report;
pub use report::function::aggregate;

pub mod run;

/// A cell that should hold a number but doesn't.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a number")]
pub struct InvalidAmount(pub String);

/// Parse a numeric cell, with an empty cell yielding `Ok(None)`.
/// Values that aren't finite numbers are an error.
pub fn parse_amount(value: &str) -> Result<Option<f64>, InvalidAmount> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .map(Some)
        .ok_or_else(|| InvalidAmount(value.to_owned()))
}

/// Render `amount` in its shortest form that parses back to the same value, without exponent.
pub fn format_amount(amount: f64) -> String {
    amount.to_string()
}
