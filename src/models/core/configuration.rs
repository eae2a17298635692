//! Filter configuration data structures.
//!
//! A configuration is a set of optional clauses (addresses and numeric ranges) that a
//! transaction must satisfy, plus the number of confirmations to wait before the
//! clauses are applied to a block.

use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serialize};

/// User-defined transaction filter
///
/// Numeric bounds are carried on the wire as decimal strings and are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
	/// Identifier referenced by recorded transactions
	pub id: u64,
	/// Unique human-readable name
	pub name: String,
	/// Free-form description
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Only active configurations take part in matching
	#[serde(default = "default_true")]
	pub active: bool,
	/// Sender the transaction must come from (case-insensitive)
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from_address: Option<String>,
	/// Recipient the transaction must go to (case-insensitive)
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to_address: Option<String>,
	/// Minimum value in wei
	#[serde(default, with = "decimal_u256", skip_serializing_if = "Option::is_none")]
	pub min_value: Option<U256>,
	/// Maximum value in wei
	#[serde(default, with = "decimal_u256", skip_serializing_if = "Option::is_none")]
	pub max_value: Option<U256>,
	/// Minimum gas price in wei
	#[serde(default, with = "decimal_u256", skip_serializing_if = "Option::is_none")]
	pub min_gas_price: Option<U256>,
	/// Maximum gas price in wei
	#[serde(default, with = "decimal_u256", skip_serializing_if = "Option::is_none")]
	pub max_gas_price: Option<U256>,
	/// Minimum gas used, checked against the receipt
	#[serde(default, with = "decimal_u256", skip_serializing_if = "Option::is_none")]
	pub min_gas_used: Option<U256>,
	/// Maximum gas used, checked against the receipt
	#[serde(default, with = "decimal_u256", skip_serializing_if = "Option::is_none")]
	pub max_gas_used: Option<U256>,
	/// Confirmations to wait before evaluating a block; 0 evaluates the tip
	#[serde(default, deserialize_with = "null_as_default")]
	pub block_delay: u64,
	/// Only match transactions whose receipt reports success
	#[serde(default = "default_true", deserialize_with = "null_as_true")]
	pub require_successful_tx: bool,
}

fn default_true() -> bool {
	true
}

// An explicit `null` reads the same as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de> + Default,
{
	Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn null_as_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
	D: Deserializer<'de>,
{
	Option::<bool>::deserialize(deserializer).map(|value| value.unwrap_or_else(default_true))
}

impl Default for Configuration {
	fn default() -> Self {
		Self {
			id: 0,
			name: String::new(),
			description: None,
			active: true,
			from_address: None,
			to_address: None,
			min_value: None,
			max_value: None,
			min_gas_price: None,
			max_gas_price: None,
			min_gas_used: None,
			max_gas_used: None,
			block_delay: 0,
			require_successful_tx: true,
		}
	}
}

impl Configuration {
	/// Whether the configuration is evaluated against the live tip
	pub fn is_live(&self) -> bool {
		self.block_delay == 0
	}

	/// Whether the configuration constrains the gas consumed by the transaction
	pub fn has_gas_used_bounds(&self) -> bool {
		self.min_gas_used.is_some() || self.max_gas_used.is_some()
	}

	/// Whether no clause is set, so every transaction matches
	pub fn is_unconstrained(&self) -> bool {
		self.from_address.is_none()
			&& self.to_address.is_none()
			&& self.min_value.is_none()
			&& self.max_value.is_none()
			&& self.min_gas_price.is_none()
			&& self.max_gas_price.is_none()
			&& !self.has_gas_used_bounds()
	}
}

/// Serde adapter for optional 256-bit integers written as decimal strings
///
/// Plain JSON integers are accepted as well, since hand-written files often use them
/// for small bounds.
mod decimal_u256 {
	use alloy::primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serializer};

	use crate::utils::parse_decimal_u256;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum DecimalRepr {
		Text(String),
		Number(u64),
	}

	pub fn serialize<S: Serializer>(
		value: &Option<U256>,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		match value {
			Some(v) => serializer.serialize_str(&v.to_string()),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(
		deserializer: D,
	) -> Result<Option<U256>, D::Error> {
		match Option::<DecimalRepr>::deserialize(deserializer)? {
			None => Ok(None),
			Some(DecimalRepr::Number(n)) => Ok(Some(U256::from(n))),
			Some(DecimalRepr::Text(text)) if text.trim().is_empty() => Ok(None),
			Some(DecimalRepr::Text(text)) => parse_decimal_u256(&text)
				.map(Some)
				.map_err(D::Error::custom),
		}
	}
}
