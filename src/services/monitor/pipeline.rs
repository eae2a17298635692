//! Block pipeline.
//!
//! Runs every transaction of a block against a set of configurations and records the
//! matches. Failures are contained: a failed block fetch skips the height for this
//! tick and a failed transaction detail fetch or write skips that transaction only.

use std::{collections::HashMap, sync::Arc, time::Duration};

use alloy::primitives::B256;
use tracing::instrument;

use crate::{
	models::{
		Configuration, EVMBlock, EVMBlockTransactions, EVMTransaction, EVMTransactionReceipt,
		ProcessedBlock, ReceiptPolicy,
	},
	repositories::TransactionRepositoryTrait,
	services::{
		blockchain::BlockChainClient,
		filter::{evm_helpers::b256_to_string, EVMTransactionFilter},
		monitor::{
			error::MonitorError,
			recorder::{build_transaction_record, MatchRecorder},
		},
	},
	utils::constants::DEFAULT_REQUEST_DELAY_MS,
};

/// Tunables of the block pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
	/// Pause before every per-transaction request (transaction or receipt)
	pub request_delay: Duration,
	/// When receipts are fetched for matched transactions
	pub receipt_policy: ReceiptPolicy,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
			receipt_policy: ReceiptPolicy::default(),
		}
	}
}

/// Outcome of evaluating one transaction
enum TransactionOutcome {
	Recorded(String),
	NoMatch,
	Skipped,
}

/// Evaluates blocks and records matching transactions
pub struct BlockPipeline<C: ?Sized, T: ?Sized> {
	client: Arc<C>,
	recorder: MatchRecorder<T>,
	filter: EVMTransactionFilter,
	config: PipelineConfig,
}

impl<C, T> BlockPipeline<C, T>
where
	C: BlockChainClient + ?Sized,
	T: TransactionRepositoryTrait + ?Sized,
{
	pub fn new(client: Arc<C>, recorder: MatchRecorder<T>, config: PipelineConfig) -> Self {
		Self {
			client,
			recorder,
			filter: EVMTransactionFilter::new(),
			config,
		}
	}

	pub fn config(&self) -> &PipelineConfig {
		&self.config
	}

	/// Fetches the block at `height` and evaluates it
	///
	/// A missing block is logged and yields an empty summary. Nothing is fetched when
	/// `configurations` is empty.
	#[instrument(skip_all, fields(block = height, delay = block_delay))]
	pub async fn process_height(
		&self,
		height: u64,
		block_delay: u64,
		configurations: &[Configuration],
	) -> Result<ProcessedBlock, MonitorError> {
		let summary = ProcessedBlock {
			block_number: height,
			block_delay,
			..Default::default()
		};
		if configurations.is_empty() {
			return Ok(summary);
		}

		let block = self.client.get_block(height, true).await.map_err(|e| {
			MonitorError::block_error(
				"Failed to fetch block",
				Some(Box::new(e)),
				Some(HashMap::from([
					("height".to_string(), height.to_string()),
					("delay".to_string(), block_delay.to_string()),
				])),
			)
		})?;

		match block {
			Some(block) => Ok(self.process(&block, block_delay, configurations).await),
			None => {
				tracing::warn!("Block not available yet, skipping");
				Ok(summary)
			}
		}
	}

	/// Evaluates every transaction of `block`, in block order, against
	/// `configurations`
	pub async fn process(
		&self,
		block: &EVMBlock,
		block_delay: u64,
		configurations: &[Configuration],
	) -> ProcessedBlock {
		let mut summary = ProcessedBlock {
			block_number: block.number().unwrap_or_default(),
			block_delay,
			transactions_seen: block.transactions().len(),
			..Default::default()
		};
		if configurations.is_empty() || block.transactions().is_empty() {
			return summary;
		}

		match block.transactions() {
			EVMBlockTransactions::Full(transactions) => {
				for transaction in transactions {
					let outcome = self
						.process_transaction(block, transaction, configurations)
						.await;
					apply_outcome(&mut summary, outcome);
				}
			}
			EVMBlockTransactions::Hashes(hashes) => {
				for hash in hashes {
					let outcome = match self.fetch_transaction(hash).await {
						Some(transaction) => {
							self.process_transaction(block, &transaction, configurations)
								.await
						}
						None => TransactionOutcome::Skipped,
					};
					apply_outcome(&mut summary, outcome);
				}
			}
		}

		if !summary.matched.is_empty() || summary.skipped > 0 {
			tracing::info!(
				block = summary.block_number,
				delay = block_delay,
				matched = summary.matched.len(),
				skipped = summary.skipped,
				"Processed block"
			);
		}
		summary
	}

	async fn fetch_transaction(&self, hash: &B256) -> Option<EVMTransaction> {
		let hash = b256_to_string(hash);
		tokio::time::sleep(self.config.request_delay).await;

		match self.client.get_transaction(&hash).await {
			Ok(Some(transaction)) => Some(transaction),
			Ok(None) => {
				tracing::warn!(tx_hash = %hash, "Transaction not found, skipping");
				None
			}
			Err(e) => {
				tracing::warn!(tx_hash = %hash, error = %e, "Failed to fetch transaction, skipping");
				None
			}
		}
	}

	/// Finds the first configuration the transaction satisfies and records it
	///
	/// The receipt is fetched at most once per transaction, the first time a matching
	/// configuration needs it.
	async fn process_transaction(
		&self,
		block: &EVMBlock,
		transaction: &EVMTransaction,
		configurations: &[Configuration],
	) -> TransactionOutcome {
		let tx_hash = b256_to_string(transaction.hash());
		let mut receipt: Option<Option<EVMTransactionReceipt>> = None;

		for configuration in configurations {
			if !self.filter.matches(transaction, configuration) {
				continue;
			}

			let needs_receipt = self.config.receipt_policy == ReceiptPolicy::Always
				|| self.filter.needs_receipt(transaction, configuration);
			if needs_receipt && receipt.is_none() {
				tokio::time::sleep(self.config.request_delay).await;
				match self.client.get_transaction_receipt(&tx_hash).await {
					Ok(fetched) => receipt = Some(fetched),
					Err(e) => {
						tracing::warn!(
							tx_hash = %tx_hash,
							error = %e,
							"Failed to fetch receipt, skipping transaction"
						);
						return TransactionOutcome::Skipped;
					}
				}
			}
			let fetched = receipt.as_ref().and_then(Option::as_ref);

			if configuration.require_successful_tx
				&& fetched.and_then(|r| r.succeeded()) != Some(true)
			{
				tracing::debug!(
					tx_hash = %tx_hash,
					configuration = configuration.id,
					"Transaction did not succeed"
				);
				continue;
			}

			// Without a gas-used figure the clause does not apply
			if let Some(gas_used) = fetched.and_then(|r| r.gas_used()) {
				if !self.filter.matches_gas_used(gas_used, configuration) {
					tracing::debug!(
						tx_hash = %tx_hash,
						configuration = configuration.id,
						"Gas used outside of range"
					);
					continue;
				}
			}

			let record = build_transaction_record(configuration.id, block, transaction, fetched);
			return match self.recorder.record(record).await {
				Ok(stored) => TransactionOutcome::Recorded(stored.transaction_hash),
				Err(e) => {
					tracing::warn!(tx_hash = %tx_hash, error = %e, "Failed to record transaction");
					TransactionOutcome::Skipped
				}
			};
		}

		TransactionOutcome::NoMatch
	}
}

fn apply_outcome(summary: &mut ProcessedBlock, outcome: TransactionOutcome) {
	match outcome {
		TransactionOutcome::Recorded(hash) => summary.matched.push(hash),
		TransactionOutcome::Skipped => summary.skipped += 1,
		TransactionOutcome::NoMatch => {}
	}
}
