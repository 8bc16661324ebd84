//! Token Amount Conversion
//!
//! Exact conversion between human-decimal DAN amounts and the token's
//! base-unit integers. All conversions MUST go through this module.
//!
//! ## Design Principles
//! 1. Exactness: base units are `U256`, human amounts are `Decimal` or
//!    decimal strings. No binary floats anywhere on the conversion path.
//! 2. Explicit Error Handling: No silent truncation
//! 3. The token contract's `decimals()` is the authority for the scale;
//!    when it cannot be read the scale falls back to 18.
//!
//! ## Usage
//! ```rust
//! use dan_settlement::money::{parse_units, format_units};
//!
//! let base = parse_units("1.5", 18).unwrap();
//! assert_eq!(base.to_string(), "1500000000000000000");
//! assert_eq!(format_units(base, 18), "1.5");
//! ```

use std::fmt::Display;

use ethers::types::U256;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

/// Scale assumed when the token's `decimals()` query fails.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// `10^77` is the largest power of ten a `U256` can hold.
pub const MAX_TOKEN_DECIMALS: u8 = 77;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported token decimals: {0}")]
    UnsupportedDecimals(u8),
}

fn scale_factor(decimals: u8) -> Result<U256, MoneyError> {
    if decimals > MAX_TOKEN_DECIMALS {
        return Err(MoneyError::UnsupportedDecimals(decimals));
    }
    Ok(U256::exp10(decimals as usize))
}

// ============================================================================
// Parse: Human → Base Units
// ============================================================================

/// Split a plain decimal string into whole and fractional digits.
///
/// Strict format: digits, optionally one dot with digits on both sides.
/// Signs, exponents, separators and hex are rejected.
fn split_plain_decimal(amount_str: &str) -> Result<(&str, &str), MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::InvalidAmount);
    }

    let (whole, frac) = match amount_str.split_once('.') {
        None => (amount_str, ""),
        Some((_, rest)) if rest.contains('.') => {
            return Err(MoneyError::InvalidFormat("multiple decimal points".into()));
        }
        Some(("", _)) => {
            return Err(MoneyError::InvalidFormat(
                "missing leading zero (e.g., use 0.5 instead of .5)".into(),
            ));
        }
        Some((_, "")) => {
            return Err(MoneyError::InvalidFormat(
                "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
            ));
        }
        Some(parts) => parts,
    };

    if !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MoneyError::InvalidFormat(format!(
            "invalid character in whole part: {}",
            whole
        )));
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MoneyError::InvalidFormat("invalid fractional part".into()));
    }

    // Trailing zeros never cost precision: "1.2300" is fine at 2 decimals.
    Ok((whole, frac.trim_end_matches('0')))
}

/// Convert a human amount string to base units.
///
/// Accepts the strict format of [`parse_amount`].
///
/// # Errors
/// * `PrecisionOverflow` - more fractional digits than the token allows
/// * `InvalidAmount` - zero or signed
/// * `Overflow` - result exceeds `U256`
/// * `InvalidFormat` - anything else that is not a plain decimal
pub fn parse_units(amount_str: &str, decimals: u8) -> Result<U256, MoneyError> {
    let (whole, frac) = split_plain_decimal(amount_str)?;
    let multiplier = scale_factor(decimals)?;

    if frac.len() > decimals as usize {
        return Err(MoneyError::PrecisionOverflow {
            provided: frac.len() as u32,
            max: decimals as u32,
        });
    }

    let whole_num = U256::from_dec_str(whole).map_err(|_| MoneyError::Overflow)?;
    let frac_num = if frac.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        U256::from_dec_str(&padded).map_err(|_| MoneyError::Overflow)?
    };

    let amount = whole_num
        .checked_mul(multiplier)
        .and_then(|v| v.checked_add(frac_num))
        .ok_or(MoneyError::Overflow)?;

    if amount.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }

    Ok(amount)
}

/// Parse a user-entered amount into an exact `Decimal`.
///
/// Same rules as [`parse_units`] without a token scale: `"1e3"`, `"-5"`,
/// `".5"`, `"1,000"` and zero are refused. The token's decimals are applied
/// later by [`to_base_units`].
pub fn parse_amount(amount_str: &str) -> Result<Decimal, MoneyError> {
    let (whole, frac) = split_plain_decimal(amount_str)?;
    let text = if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    };
    let amount = Decimal::from_str_exact(&text).map_err(|_| MoneyError::Overflow)?;
    if amount.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }
    Ok(amount.normalize())
}

/// Convert a `Decimal` amount to base units.
///
/// Trailing zeros in the decimal's scale are ignored; significant digits
/// beyond `decimals` are rejected rather than rounded.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256, MoneyError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }

    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > decimals as u32 {
        return Err(MoneyError::PrecisionOverflow {
            provided: scale,
            max: decimals as u32,
        });
    }

    let mantissa = U256::from(normalized.mantissa().unsigned_abs());
    let shift = scale_factor(decimals - scale as u8)?;
    mantissa.checked_mul(shift).ok_or(MoneyError::Overflow)
}

// ============================================================================
// Format: Base Units → Human
// ============================================================================

/// Full-precision decimal string for a base-unit value.
///
/// Trailing fractional zeros are trimmed: `1500000000000000000` at 18
/// decimals formats as `"1.5"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    if decimals == 0 {
        return digits;
    }

    let width = decimals as usize + 1;
    let padded = format!("{:0>width$}", digits, width = width);
    let (whole, frac) = padded.split_at(padded.len() - decimals as usize);
    let frac = frac.trim_end_matches('0');

    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}

/// Display string truncated (not rounded) to `display_decimals` places.
///
/// Used for balances shown in user-facing messages, where over-reporting
/// an available balance would be worse than under-reporting it.
pub fn format_units_display(value: U256, decimals: u8, display_decimals: u8) -> String {
    let full = format_units(value, decimals);
    match full.split_once('.') {
        Some((whole, _)) if display_decimals == 0 => whole.to_string(),
        Some((whole, frac)) => {
            let cut = &frac[..frac.len().min(display_decimals as usize)];
            let cut = cut.trim_end_matches('0');
            if cut.is_empty() {
                whole.to_string()
            } else {
                format!("{}.{}", whole, cut)
            }
        }
        None => full,
    }
}

/// Convert base units back to an exact `Decimal`.
///
/// Fails with `Overflow` when the value does not fit `Decimal`'s 28 digits
/// of precision; it never rounds.
pub fn from_base_units(value: U256, decimals: u8) -> Result<Decimal, MoneyError> {
    let text = format_units(value, decimals);
    Decimal::from_str_exact(&text).map_err(|_| MoneyError::Overflow)
}

// ============================================================================
// Decimals Resolution
// ============================================================================

/// Resolve the token's decimals from a `decimals()` query result.
///
/// A failed query falls back to [`DEFAULT_TOKEN_DECIMALS`] with a warning
/// instead of failing the operation.
pub fn resolve_decimals<E: Display>(queried: Result<u8, E>) -> u8 {
    match queried {
        Ok(decimals) => decimals,
        Err(e) => {
            warn!(
                error = %e,
                fallback = DEFAULT_TOKEN_DECIMALS,
                "Failed to read token decimals, using default"
            );
            DEFAULT_TOKEN_DECIMALS
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
