//! Helper functions for EVM-specific operations.
//!
//! Address and hash conversions shared by the filter, the client and the recorder.

use alloy::primitives::{Address, B256};

/// Converts a B256 hash to its lowercase, 0x-prefixed hexadecimal representation.
pub fn b256_to_string(hash: &B256) -> String {
	format!("0x{}", hex::encode(hash.as_slice()))
}

/// Converts a hexadecimal string to a B256 hash.
///
/// # Arguments
/// * `hash_string` - The string to convert, with or without "0x" prefix
///
/// # Errors
/// Returns an error if the input is not 32 bytes of valid hexadecimal
pub fn string_to_b256(hash_string: &str) -> Result<B256, String> {
	let trimmed = hash_string.trim();
	let hash_without_prefix = trimmed.strip_prefix("0x").unwrap_or(trimmed);
	let hash_bytes = hex::decode(hash_without_prefix)
		.map_err(|e| format!("'{}' is not hexadecimal: {}", hash_string, e))?;
	if hash_bytes.len() != 32 {
		return Err(format!(
			"'{}' is {} bytes long, expected 32",
			hash_string,
			hash_bytes.len()
		));
	}
	Ok(B256::from_slice(&hash_bytes))
}

/// Converts an H160 address to its lowercase, 0x-prefixed hexadecimal representation.
pub fn h160_to_string(address: &Address) -> String {
	format!("0x{}", hex::encode(address.as_slice()))
}

/// Compares two addresses for equality, ignoring case and "0x" prefixes.
pub fn are_same_address(address1: &str, address2: &str) -> bool {
	normalize_address(address1) == normalize_address(address2)
}

/// Normalizes an address string by removing "0x" prefix, spaces, and converting to lowercase.
pub fn normalize_address(address: &str) -> String {
	let trimmed = address.trim();
	trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
		.unwrap_or(trimmed)
		.replace(' ', "")
		.to_lowercase()
}
