//! Account address validation (EIP-55)

use ethers::types::Address;
use ethers::utils::to_checksum;

use super::error::ChainError;

/// Parse a `0x`-prefixed 20-byte hex address.
///
/// All-lowercase and all-uppercase forms are accepted as-is. Mixed case is
/// treated as an EIP-55 checksum and must match exactly.
pub fn parse_address(input: &str) -> Result<Address, ChainError> {
    let input = input.trim();

    let hex_part = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| ChainError::InvalidAddress(format!("missing 0x prefix: {}", input)))?;

    if hex_part.len() != 40 {
        return Err(ChainError::InvalidAddress(format!(
            "expected 40 hex characters, got {}: {}",
            hex_part.len(),
            input
        )));
    }

    if !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ChainError::InvalidAddress(format!(
            "non-hex character: {}",
            input
        )));
    }

    let address: Address = hex_part
        .parse()
        .map_err(|e| ChainError::InvalidAddress(format!("{}: {}", input, e)))?;

    let has_lower = hex_part.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex_part.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        let expected = to_checksum(&address, None);
        if expected[2..] != *hex_part {
            return Err(ChainError::InvalidAddress(format!(
                "bad checksum: {}",
                input
            )));
        }
    }

    Ok(address)
}

/// EIP-55 form used in logs and ledger payloads.
pub fn checksummed(address: &Address) -> String {
    to_checksum(address, None)
}
