//! Idempotent recording of matched transactions.
//!
//! A transaction hash is stored at most once. Recording a hash that is already
//! stored returns the stored record untouched, which is what makes re-evaluating a
//! block harmless.

use std::{collections::HashMap, sync::Arc};

use alloy::primitives::U256;
use chrono::Utc;

use crate::{
	models::{
		EVMBlock, EVMTransaction, EVMTransactionReceipt, TransactionRecord, TransactionStatus,
	},
	repositories::{RepositoryError, TransactionRepositoryTrait},
	services::{
		filter::evm_helpers::{b256_to_string, h160_to_string},
		monitor::error::MonitorError,
	},
};

/// Builds the record of a matched transaction
///
/// Block number, hash and time come from the block. Gas used, status and contract
/// address come from the receipt when one was fetched; otherwise gas used is the gas
/// limit and the status is unknown.
pub fn build_transaction_record(
	configuration_id: u64,
	block: &EVMBlock,
	transaction: &EVMTransaction,
	receipt: Option<&EVMTransactionReceipt>,
) -> TransactionRecord {
	let block_number = block
		.number()
		.or_else(|| transaction.block_number.map(|n| n.to::<u64>()))
		.unwrap_or_default();
	let block_hash = block
		.hash()
		.or(transaction.block_hash.as_ref())
		.map(b256_to_string)
		.unwrap_or_default();

	let gas_used = receipt
		.and_then(|r| r.gas_used())
		.unwrap_or(transaction.gas());
	let gas_price = transaction
		.gas_price()
		.or_else(|| receipt.and_then(|r| r.effective_gas_price.as_ref()))
		.copied()
		.unwrap_or(U256::ZERO);

	TransactionRecord {
		configuration_id,
		transaction_hash: b256_to_string(transaction.hash()),
		block_number,
		block_hash,
		from: transaction
			.sender()
			.or_else(|| receipt.and_then(|r| r.from.as_ref()))
			.map(h160_to_string)
			.unwrap_or_default(),
		to: transaction.to().map(h160_to_string),
		value: transaction.value().to_string(),
		gas_used: gas_used.to_string(),
		gas_price: gas_price.to_string(),
		input: transaction.input().to_string(),
		nonce: transaction.nonce().to_string(),
		contract_address: receipt
			.and_then(|r| r.contract_address())
			.map(h160_to_string),
		status: TransactionStatus::from(receipt.and_then(|r| r.succeeded())),
		timestamp: block.timestamp(),
		raw_data: transaction.raw_json(),
		created_at: Utc::now(),
	}
}

/// Records matched transactions exactly once per hash
pub struct MatchRecorder<T: ?Sized> {
	repository: Arc<T>,
}

impl<T: TransactionRepositoryTrait + ?Sized> Clone for MatchRecorder<T> {
	fn clone(&self) -> Self {
		Self {
			repository: self.repository.clone(),
		}
	}
}

impl<T: TransactionRepositoryTrait + ?Sized> MatchRecorder<T> {
	pub fn new(repository: Arc<T>) -> Self {
		Self { repository }
	}

	/// Stores `record` unless its hash is already stored
	///
	/// # Returns
	/// The stored record: the new one, or the existing one unchanged. A concurrent
	/// insert of the same hash is resolved by reading back the winner.
	pub async fn record(&self, record: TransactionRecord) -> Result<TransactionRecord, MonitorError> {
		let hash = record.transaction_hash.clone();

		if let Some(existing) = self.find(&hash).await? {
			tracing::debug!(tx_hash = %hash, "Transaction already recorded");
			return Ok(existing);
		}

		match self.repository.insert(record).await {
			Ok(stored) => {
				tracing::info!(
					tx_hash = %stored.transaction_hash,
					configuration = stored.configuration_id,
					block = stored.block_number,
					"Recorded matching transaction"
				);
				Ok(stored)
			}
			Err(RepositoryError::Duplicate(_)) => {
				self.find(&hash).await?.ok_or_else(|| {
					MonitorError::record_error(
						"Duplicate reported but no record found",
						None,
						Some(HashMap::from([("hash".to_string(), hash.clone())])),
					)
				})
			}
			Err(e) => Err(MonitorError::record_error(
				"Failed to record transaction",
				Some(Box::new(e)),
				Some(HashMap::from([("hash".to_string(), hash)])),
			)),
		}
	}

	async fn find(&self, hash: &str) -> Result<Option<TransactionRecord>, MonitorError> {
		self.repository.find_by_hash(hash).await.map_err(|e| {
			MonitorError::record_error(
				"Failed to look up transaction",
				Some(Box::new(e)),
				Some(HashMap::from([("hash".to_string(), hash.to_string())])),
			)
		})
	}
}
