//! EVM transaction filter implementation.
//!
//! Evaluates a [`Configuration`] against a single transaction. Clauses are checked in a
//! fixed order and evaluation stops at the first one that fails:
//! - sender address
//! - recipient address (contract creations never match a recipient filter)
//! - value range
//! - gas price range, when the transaction carries a gas price
//! - gas used range, when a gas used figure is available
//!
//! All bounds are inclusive and compared as 256-bit integers.

use alloy::primitives::U256;

use crate::{
	models::{Configuration, EVMTransaction},
	services::filter::evm_helpers::{are_same_address, b256_to_string, h160_to_string},
};

/// Returns whether `value` lies within the optional inclusive bounds
fn within_bounds(value: &U256, min: Option<&U256>, max: Option<&U256>) -> bool {
	min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
}

/// Filter implementation for EVM transactions
#[derive(Debug, Clone, Copy, Default)]
pub struct EVMTransactionFilter;

impl EVMTransactionFilter {
	pub fn new() -> Self {
		Self
	}

	/// Checks whether a transaction satisfies every clause of a configuration
	///
	/// The gas used clause is skipped because a transaction alone carries no gas
	/// used figure; see [`Self::matches_with_gas_used`].
	pub fn matches(&self, transaction: &EVMTransaction, configuration: &Configuration) -> bool {
		self.matches_with_gas_used(transaction, None, configuration)
	}

	/// Same as [`Self::matches`], additionally checking the gas used clause when
	/// `gas_used` is known
	pub fn matches_with_gas_used(
		&self,
		transaction: &EVMTransaction,
		gas_used: Option<&U256>,
		configuration: &Configuration,
	) -> bool {
		let tx_hash = b256_to_string(transaction.hash());

		if let Some(expected) = &configuration.from_address {
			let sender_matches = transaction
				.sender()
				.is_some_and(|sender| are_same_address(&h160_to_string(sender), expected));
			if !sender_matches {
				tracing::debug!(
					tx_hash = %tx_hash,
					configuration = configuration.id,
					"Sender does not match"
				);
				return false;
			}
		}

		if let Some(expected) = &configuration.to_address {
			let recipient_matches = transaction
				.to()
				.is_some_and(|to| are_same_address(&h160_to_string(to), expected));
			if !recipient_matches {
				tracing::debug!(
					tx_hash = %tx_hash,
					configuration = configuration.id,
					contract_creation = transaction.is_contract_creation(),
					"Recipient does not match"
				);
				return false;
			}
		}

		if !within_bounds(
			transaction.value(),
			configuration.min_value.as_ref(),
			configuration.max_value.as_ref(),
		) {
			tracing::debug!(
				tx_hash = %tx_hash,
				configuration = configuration.id,
				value = %transaction.value(),
				"Value outside of range"
			);
			return false;
		}

		if let Some(gas_price) = transaction.gas_price() {
			if !within_bounds(
				gas_price,
				configuration.min_gas_price.as_ref(),
				configuration.max_gas_price.as_ref(),
			) {
				tracing::debug!(
					tx_hash = %tx_hash,
					configuration = configuration.id,
					gas_price = %gas_price,
					"Gas price outside of range"
				);
				return false;
			}
		}

		if let Some(gas_used) = gas_used {
			if !self.matches_gas_used(gas_used, configuration) {
				tracing::debug!(
					tx_hash = %tx_hash,
					configuration = configuration.id,
					gas_used = %gas_used,
					"Gas used outside of range"
				);
				return false;
			}
		}

		true
	}

	/// Checks the gas used clause alone
	pub fn matches_gas_used(&self, gas_used: &U256, configuration: &Configuration) -> bool {
		within_bounds(
			gas_used,
			configuration.min_gas_used.as_ref(),
			configuration.max_gas_used.as_ref(),
		)
	}

	/// Whether deciding or recording a match needs the transaction receipt
	///
	/// That is the case when the configuration requires success or bounds the gas
	/// used, and for contract creations, whose deployed address is only known from
	/// the receipt.
	pub fn needs_receipt(&self, transaction: &EVMTransaction, configuration: &Configuration) -> bool {
		configuration.require_successful_tx
			|| configuration.has_gas_used_bounds()
			|| transaction.is_contract_creation()
	}
}
