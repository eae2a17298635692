//! EVM transaction data structures.

use std::{collections::HashMap, ops::Deref};

use alloy::primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

/// Transaction object as returned by `eth_getTransactionByHash` and full blocks
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct BaseTransaction {
	/// Hash
	pub hash: B256,
	/// Nonce
	#[serde(default)]
	pub nonce: U256,
	/// Block hash. None when pending.
	#[serde(rename = "blockHash", default)]
	pub block_hash: Option<B256>,
	/// Block number. None when pending.
	#[serde(rename = "blockNumber", default)]
	pub block_number: Option<U64>,
	/// Position in the block. None when pending.
	#[serde(rename = "transactionIndex", default)]
	pub transaction_index: Option<U64>,
	/// Sender
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<Address>,
	/// Recipient (None when contract creation)
	#[serde(default)]
	pub to: Option<Address>,
	/// Transferred value in wei
	#[serde(default)]
	pub value: U256,
	/// Gas price. Some nodes omit it for EIP-1559 transactions.
	#[serde(rename = "gasPrice", default, skip_serializing_if = "Option::is_none")]
	pub gas_price: Option<U256>,
	/// Gas limit
	#[serde(default)]
	pub gas: U256,
	/// Input data
	#[serde(default)]
	pub input: Bytes,
	/// Transaction type, None for legacy nodes that do not report it
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub transaction_type: Option<U64>,
	/// Max fee per gas
	#[serde(
		rename = "maxFeePerGas",
		default,
		skip_serializing_if = "Option::is_none"
	)]
	pub max_fee_per_gas: Option<U256>,
	/// Max priority fee per gas
	#[serde(
		rename = "maxPriorityFeePerGas",
		default,
		skip_serializing_if = "Option::is_none"
	)]
	pub max_priority_fee_per_gas: Option<U256>,

	/// Every other field the node returned, kept so the raw snapshot is complete
	#[serde(flatten)]
	pub extra: HashMap<String, serde_json::Value>,
}

/// Wrapper around Base Transaction that implements additional functionality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Transaction(pub BaseTransaction);

impl Transaction {
	/// Get the transaction value (amount of ETH transferred)
	pub fn value(&self) -> &U256 {
		&self.0.value
	}

	/// Get the transaction sender address
	pub fn sender(&self) -> Option<&Address> {
		self.0.from.as_ref()
	}

	/// Get the transaction recipient address (None for contract creation)
	pub fn to(&self) -> Option<&Address> {
		self.0.to.as_ref()
	}

	/// Get the gas limit for the transaction
	pub fn gas(&self) -> &U256 {
		&self.0.gas
	}

	/// Get the gas price, if the node reported one
	pub fn gas_price(&self) -> Option<&U256> {
		self.0.gas_price.as_ref()
	}

	/// Get the transaction nonce
	pub fn nonce(&self) -> &U256 {
		&self.0.nonce
	}

	/// Get the transaction hash
	pub fn hash(&self) -> &B256 {
		&self.0.hash
	}

	/// Get the call data
	pub fn input(&self) -> &Bytes {
		&self.0.input
	}

	/// Whether the transaction deploys a contract
	pub fn is_contract_creation(&self) -> bool {
		self.0.to.is_none()
	}

	/// Full JSON snapshot of the transaction as it was received
	pub fn raw_json(&self) -> serde_json::Value {
		serde_json::to_value(&self.0).unwrap_or(serde_json::Value::Null)
	}
}

impl From<BaseTransaction> for Transaction {
	fn from(tx: BaseTransaction) -> Self {
		Self(tx)
	}
}

impl Deref for Transaction {
	type Target = BaseTransaction;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
