//! Conversions between base units and decimal token amounts.
//!
//! Both directions work on the decimal digits directly, so no precision is
//! lost to floating point. Formatting is exact; parsing truncates digits
//! below one base unit.

use crate::error::EscrowError;

/// Formats `amount` base units with exactly `decimals` fractional digits.
///
/// `format_amount(1_000_000, 6)` is `"1.000000"`; a zero-decimal mint has no
/// decimal point.
pub fn format_amount(amount: u64, decimals: u8) -> String {
    let decimals = decimals as usize;
    let digits = amount.to_string();
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    format!("{whole}.{fraction}")
}

/// Scales a user-entered decimal string into base units.
///
/// Accepts `"12"`, `"12.5"`, `".5"` and `"12."`. Fraction digits beyond
/// `decimals` are dropped.
pub fn parse_amount(input: &str, decimals: u8) -> Result<u64, EscrowError> {
    let input = input.trim();
    let invalid = || EscrowError::InvalidAmount(format!("'{input}' is not a decimal amount"));

    let (whole, fraction) = match input.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (input, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let decimals = decimals as usize;
    let kept = &fraction[..fraction.len().min(decimals)];

    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    digits.push_str(kept);
    digits.extend(std::iter::repeat('0').take(decimals - kept.len()));

    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(0);
    }
    significant
        .parse::<u64>()
        .map_err(|_| EscrowError::InvalidAmount(format!("'{input}' does not fit in a u64")))
}
