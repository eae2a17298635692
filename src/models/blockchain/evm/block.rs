//! EVM block data structures.

use alloy::primitives::{B256, U256, U64};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

use super::EVMTransaction;

/// Transactions of a block, either as full objects or as hashes only
///
/// `eth_getBlockByNumber` returns one or the other depending on its second parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransactions {
	/// Full transaction objects
	Full(Vec<EVMTransaction>),
	/// Transaction hashes only
	Hashes(Vec<B256>),
}

impl Default for BlockTransactions {
	fn default() -> Self {
		Self::Full(Vec::new())
	}
}

impl BlockTransactions {
	/// Number of transactions in the block
	pub fn len(&self) -> usize {
		match self {
			Self::Full(txs) => txs.len(),
			Self::Hashes(hashes) => hashes.len(),
		}
	}

	/// Whether the block carries no transactions
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Block header fields the monitor needs, plus its transactions
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct BaseBlock {
	/// Hash of the block. None if pending.
	pub hash: Option<B256>,
	/// Hash of the parent
	#[serde(rename = "parentHash", default)]
	pub parent_hash: B256,
	/// Block number. None if pending.
	pub number: Option<U64>,
	/// Timestamp in seconds since the epoch
	pub timestamp: U256,
	/// Gas Used
	#[serde(rename = "gasUsed", default)]
	pub gas_used: U256,
	/// Base fee per unit of gas (if past London)
	#[serde(
		rename = "baseFeePerGas",
		default,
		skip_serializing_if = "Option::is_none"
	)]
	pub base_fee_per_gas: Option<U256>,
	/// Transactions
	#[serde(default)]
	pub transactions: BlockTransactions,
}

/// Wrapper around Base Block that implements additional functionality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block(pub BaseBlock);

impl Block {
	/// Get the block number
	pub fn number(&self) -> Option<u64> {
		self.0.number.map(|n| n.to::<u64>())
	}

	/// Get the block hash
	pub fn hash(&self) -> Option<&B256> {
		self.0.hash.as_ref()
	}

	/// Block time as a UTC timestamp
	///
	/// Timestamps that do not fit a `DateTime` fall back to the Unix epoch.
	pub fn timestamp(&self) -> DateTime<Utc> {
		let seconds = i64::try_from(self.0.timestamp).unwrap_or_default();
		Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
	}

	/// Get the block's transactions
	pub fn transactions(&self) -> &BlockTransactions {
		&self.0.transactions
	}
}

impl From<BaseBlock> for Block {
	fn from(block: BaseBlock) -> Self {
		Self(block)
	}
}

impl Deref for Block {
	type Target = BaseBlock;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
