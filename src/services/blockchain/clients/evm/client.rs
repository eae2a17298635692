//! EVM-compatible blockchain client implementation.
//!
//! Reads blocks, transactions and receipts over JSON-RPC.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::instrument;

use crate::{
	models::{EVMBlock, EVMTransaction, EVMTransactionReceipt, Network},
	services::{
		blockchain::{
			client::BlockChainClient,
			transports::{BlockchainTransport, EVMTransportClient},
			BlockChainError,
		},
		filter::evm_helpers::{b256_to_string, string_to_b256},
	},
};

/// Client implementation for Ethereum Virtual Machine (EVM) compatible blockchains
///
/// Provides high-level access to EVM blockchain data through a JSON-RPC transport.
#[derive(Clone)]
pub struct EvmClient<T: Send + Sync + Clone> {
	/// The underlying transport for RPC communication
	http_client: T,
}

impl<T: Send + Sync + Clone> EvmClient<T> {
	/// Creates a new EVM client instance with a specific transport client
	pub fn new_with_transport(http_client: T) -> Self {
		Self { http_client }
	}
}

impl EvmClient<EVMTransportClient> {
	/// Creates a new EVM client connected to the first healthy endpoint of `network`
	pub async fn new(network: &Network) -> Result<Self, anyhow::Error> {
		let client = EVMTransportClient::new(network).await?;
		Ok(Self::new_with_transport(client))
	}
}

/// Extracts `result` from a JSON-RPC response, surfacing an `error` object as a
/// request error
fn extract_result(response: Value, method: &str) -> Result<Value, BlockChainError> {
	if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
		let message = error
			.get("message")
			.and_then(Value::as_str)
			.unwrap_or("unknown JSON-RPC error")
			.to_string();
		let code = error
			.get("code")
			.map(|c| c.to_string())
			.unwrap_or_default();
		return Err(BlockChainError::request_error(
			message,
			None,
			Some(HashMap::from([
				("method".to_string(), method.to_string()),
				("code".to_string(), code),
			])),
		));
	}

	match response {
		Value::Object(mut map) => map.remove("result").ok_or_else(|| {
			BlockChainError::request_error(
				"Missing 'result' field",
				None,
				Some(HashMap::from([("method".to_string(), method.to_string())])),
			)
		}),
		_ => Err(BlockChainError::request_error(
			"JSON-RPC response is not an object",
			None,
			Some(HashMap::from([("method".to_string(), method.to_string())])),
		)),
	}
}

/// Parses a nullable `result`, mapping `null` to `None`
fn parse_optional<R: DeserializeOwned>(
	result: Value,
	what: &str,
) -> Result<Option<R>, BlockChainError> {
	if result.is_null() {
		return Ok(None);
	}
	let parsed = serde_json::from_value(result).with_context(|| format!("Failed to parse {}", what))?;
	Ok(Some(parsed))
}

fn normalize_hash(transaction_hash: &str) -> Result<String, BlockChainError> {
	string_to_b256(transaction_hash)
		.map(|hash| b256_to_string(&hash))
		.map_err(|e| {
			BlockChainError::transaction_error(
				format!("Invalid transaction hash: {}", e),
				None,
				Some(HashMap::from([(
					"hash".to_string(),
					transaction_hash.to_string(),
				)])),
			)
		})
}

impl<T: Send + Sync + Clone + BlockchainTransport> EvmClient<T> {
	async fn call(&self, method: &str, params: Value) -> Result<Value, BlockChainError> {
		let response = self
			.http_client
			.send_raw_request(method, Some(params))
			.await
			.with_context(|| format!("Failed to call {}", method))?;
		extract_result(response, method)
	}
}

#[async_trait]
impl<T: Send + Sync + Clone + BlockchainTransport> BlockChainClient for EvmClient<T> {
	#[instrument(skip(self))]
	async fn get_latest_block_number(&self) -> Result<u64, BlockChainError> {
		let result = self.call("eth_blockNumber", json!([])).await?;

		let hex_str = result
			.as_str()
			.with_context(|| "Block number is not a string")?;

		let number = u64::from_str_radix(hex_str.trim_start_matches("0x"), 16)
			.with_context(|| format!("Failed to parse block number: {}", hex_str))?;
		Ok(number)
	}

	#[instrument(skip(self))]
	async fn get_block(
		&self,
		block_number: u64,
		full_transactions: bool,
	) -> Result<Option<EVMBlock>, BlockChainError> {
		let result = self
			.call(
				"eth_getBlockByNumber",
				json!([format!("0x{:x}", block_number), full_transactions]),
			)
			.await?;
		parse_optional(result, "block")
	}

	#[instrument(skip(self))]
	async fn get_transaction(
		&self,
		transaction_hash: &str,
	) -> Result<Option<EVMTransaction>, BlockChainError> {
		let hash = normalize_hash(transaction_hash)?;
		let result = self
			.call("eth_getTransactionByHash", json!([hash]))
			.await?;
		parse_optional(result, "transaction")
	}

	#[instrument(skip(self))]
	async fn get_transaction_receipt(
		&self,
		transaction_hash: &str,
	) -> Result<Option<EVMTransactionReceipt>, BlockChainError> {
		let hash = normalize_hash(transaction_hash)?;
		let result = self
			.call("eth_getTransactionReceipt", json!([hash]))
			.await?;
		parse_optional(result, "transaction receipt")
	}
}
