//! Parsing utilities
//!
//! This module provides utilities for parsing numbers and environment values.

use alloy::primitives::U256;
use std::{env, str::FromStr};

/// Parses a non-negative decimal integer string into a 256-bit unsigned integer.
///
/// Surrounding whitespace is ignored. Signs, decimal points, exponents and hex
/// prefixes are rejected so that wei-scale amounts are never silently truncated.
pub fn parse_decimal_u256(value: &str) -> Result<U256, String> {
	let trimmed = value.trim();
	if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
		return Err(format!("Invalid decimal integer: '{}'", value));
	}
	U256::from_str_radix(trimmed, 10)
		.map_err(|e| format!("Invalid decimal integer: '{}'. Error: {}", value, e))
}

/// Normalizes a string by trimming whitespace and converting to lowercase.
pub fn normalize_string(input: &str) -> String {
	input.trim().to_lowercase()
}

/// Reads an environment variable, treating unset and blank values alike.
pub fn env_var_non_empty(name: &str) -> Option<String> {
	env::var(name)
		.ok()
		.map(|value| value.trim().to_string())
		.filter(|value| !value.is_empty())
}

/// Reads and parses an environment variable, returning `default` when it is unset.
///
/// A value that is set but does not parse is reported as an error rather than
/// replaced by the default.
pub fn parse_env_or<T>(name: &str, default: T) -> Result<T, String>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	parse_var_or(env_var_non_empty, name, default)
}

/// Same as [`parse_env_or`], reading values through `lookup` instead of the process
/// environment.
pub fn parse_var_or<F, T>(lookup: F, name: &str, default: T) -> Result<T, String>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
	T::Err: std::fmt::Display,
{
	match lookup(name) {
		Some(raw) => raw
			.parse::<T>()
			.map_err(|e| format!("Invalid value for {}: '{}'. Error: {}", name, raw, e)),
		None => Ok(default),
	}
}
