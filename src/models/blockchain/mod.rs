//! Blockchain-specific model implementations.
//!
//! Only EVM chains are supported. The `evm` submodule mirrors the JSON-RPC shapes of
//! blocks, transactions and receipts.

use serde::{Deserialize, Serialize};

pub mod evm;

/// Outcome of running one block through the matching pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedBlock {
	/// Height of the evaluated block
	pub block_number: u64,
	/// Confirmation delay the block was evaluated for (0 for the live tip)
	pub block_delay: u64,
	/// Number of transactions inspected
	pub transactions_seen: usize,
	/// Transaction hashes recorded (or found already recorded) during this run
	pub matched: Vec<String>,
	/// Transactions skipped because fetching details or recording failed
	pub skipped: usize,
}
