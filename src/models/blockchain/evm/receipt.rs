//! EVM receipt data structures.

use std::ops::Deref;

use alloy::primitives::{Address, B256, U256, U64};
use serde::{Deserialize, Serialize};

/// Receipt object as returned by `eth_getTransactionReceipt`
///
/// Logs are kept as raw JSON; matching never looks inside them.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseReceipt {
	/// Transaction hash.
	#[serde(rename = "transactionHash")]
	pub transaction_hash: B256,
	/// Hash of the block this transaction was included within.
	#[serde(rename = "blockHash", default)]
	pub block_hash: Option<B256>,
	/// Number of the block this transaction was included within.
	#[serde(rename = "blockNumber", default)]
	pub block_number: Option<U64>,
	/// Sender, if the node reports it
	#[serde(default)]
	pub from: Option<Address>,
	/// Recipient (None when contract creation)
	#[serde(default)]
	pub to: Option<Address>,
	/// Cumulative gas used within the block after this was executed.
	#[serde(rename = "cumulativeGasUsed", default)]
	pub cumulative_gas_used: U256,
	/// Gas used by this transaction alone.
	///
	/// Gas used is `None` if the the client is running in light client mode.
	#[serde(rename = "gasUsed", default)]
	pub gas_used: Option<U256>,
	/// Contract address created, or `None` if not a deployment.
	#[serde(rename = "contractAddress", default)]
	pub contract_address: Option<Address>,
	/// Status: either 1 (success) or 0 (failure). Missing before Byzantium.
	#[serde(default)]
	pub status: Option<U64>,
	/// Effective gas price
	#[serde(rename = "effectiveGasPrice", default)]
	pub effective_gas_price: Option<U256>,
	/// Logs generated within this transaction.
	#[serde(default)]
	pub logs: Vec<serde_json::Value>,
}

/// Wrapper around Base Receipt that implements additional functionality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TransactionReceipt(pub BaseReceipt);

impl TransactionReceipt {
	/// Post-execution status: `Some(true)` on success, `Some(false)` on failure and
	/// `None` when the node did not report one
	pub fn succeeded(&self) -> Option<bool> {
		self.0.status.map(|status| status == U64::from(1u64))
	}

	/// Gas consumed by this transaction, if reported
	pub fn gas_used(&self) -> Option<&U256> {
		self.0.gas_used.as_ref()
	}

	/// Address of the deployed contract for contract creations
	pub fn contract_address(&self) -> Option<&Address> {
		self.0.contract_address.as_ref()
	}
}

impl From<BaseReceipt> for TransactionReceipt {
	fn from(receipt: BaseReceipt) -> Self {
		Self(receipt)
	}
}

impl Deref for TransactionReceipt {
	type Target = BaseReceipt;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
