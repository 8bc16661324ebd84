//! Local input checks run before any account request is sent

use rust_decimal::Decimal;

use crate::chain::{checksummed, parse_address};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Amount has more than {max} decimal places")]
    TooPrecise { max: u32 },

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Invalid package id: {0}")]
    InvalidPackage(i64),

    #[error("Page must be at least 1")]
    InvalidPage,

    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Ledger amounts carry at most this many decimals
pub const MAX_LEDGER_SCALE: u32 = 8;

pub fn validate_amount(amount: Decimal) -> Result<Decimal, ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }
    let amount = amount.normalize();
    if amount.scale() > MAX_LEDGER_SCALE {
        return Err(ValidationError::TooPrecise {
            max: MAX_LEDGER_SCALE,
        });
    }
    Ok(amount)
}

/// Returns the address in checksummed form.
pub fn validate_wallet_address(address: &str) -> Result<String, ValidationError> {
    parse_address(address)
        .map(|a| checksummed(&a))
        .map_err(|e| ValidationError::InvalidAddress(e.to_string()))
}

pub fn validate_package_id(p_id: i64) -> Result<i64, ValidationError> {
    if p_id <= 0 {
        return Err(ValidationError::InvalidPackage(p_id));
    }
    Ok(p_id)
}

/// Trimmed, non-empty name field
pub fn validate_name(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}
