//! Grid Engine numeric quantities.
//!
//! Memory requests and node descriptors use magnitude suffixes: upper case
//! `K`, `M`, `G`, `T` are powers of 1024, lower case `k`, `m`, `g`, `t` are
//! powers of 1000. Time limits may be written as `HH:MM:SS`.

use crate::error::{AccountingError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static SUFFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9.]+)(\D+)$").expect("static regex is valid"));
static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d+):(\d+)$").expect("static regex is valid"));

const BINARY_SUFFIXES: [char; 4] = ['K', 'M', 'G', 'T'];
const DECIMAL_SUFFIXES: [char; 4] = ['k', 'm', 'g', 't'];

/// Expand a Grid Engine number (`"64G"`, `"1.5t"`, `"01:30:00"`, `"42"`)
/// into a plain integer. Fractional results are truncated.
pub fn parse_quantity(value: &str) -> Result<u64> {
    let value = value.trim();
    let invalid = || AccountingError::InvalidQuantity(value.to_string());

    if let Some(caps) = SUFFIXED.captures(value) {
        let mantissa: f64 = caps[1].parse().map_err(|_| invalid())?;
        let suffix = &caps[2];
        let mut chars = suffix.chars();
        let (Some(unit), None) = (chars.next(), chars.next()) else {
            return Err(invalid());
        };

        let scale = if let Some(pos) = BINARY_SUFFIXES.iter().position(|c| *c == unit) {
            1024f64.powi(pos as i32 + 1)
        } else if let Some(pos) = DECIMAL_SUFFIXES.iter().position(|c| *c == unit) {
            1000f64.powi(pos as i32 + 1)
        } else {
            return Err(invalid());
        };

        return Ok((mantissa * scale) as u64);
    }

    if let Some(caps) = CLOCK.captures(value) {
        let field = |i: usize| caps[i].parse::<u64>().map_err(|_| invalid());
        return Ok(field(1)? * 3600 + field(2)? * 60 + field(3)?);
    }

    value.parse::<u64>().map_err(|_| invalid())
}
