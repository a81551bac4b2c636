//! Decimal parsing for statement cells.

use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

/// Parse a statement amount cell into an exact decimal.
///
/// Thousands separators are dropped and a blank cell counts as zero, since
/// exports leave the unused side of a Paid In / Paid Out pair empty.
pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(&cleaned).with_context(|| format!("invalid number {s:?}"))
}

/// Convert an integer amount of minor units (pence, cents) to major units.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}
