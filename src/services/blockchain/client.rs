//! Core blockchain client interface.
//!
//! The monitor reads chain data only through [`BlockChainClient`], so any data source
//! (JSON-RPC over HTTP, a test double) can back it.

use async_trait::async_trait;

use crate::{
	models::{EVMBlock, EVMTransaction, EVMTransactionReceipt},
	services::blockchain::BlockChainError,
};

/// Read access to an EVM chain
///
/// Lookups of things the node does not know (a height beyond the tip, an unknown
/// hash) return `Ok(None)` rather than an error.
#[async_trait]
pub trait BlockChainClient: Send + Sync {
	/// Retrieves the latest block number from the blockchain
	async fn get_latest_block_number(&self) -> Result<u64, BlockChainError>;

	/// Retrieves a block by height
	///
	/// With `full_transactions` the block carries transaction objects, otherwise
	/// only their hashes.
	async fn get_block(
		&self,
		block_number: u64,
		full_transactions: bool,
	) -> Result<Option<EVMBlock>, BlockChainError>;

	/// Retrieves a transaction by hash
	async fn get_transaction(
		&self,
		transaction_hash: &str,
	) -> Result<Option<EVMTransaction>, BlockChainError>;

	/// Retrieves a transaction receipt by hash
	async fn get_transaction_receipt(
		&self,
		transaction_hash: &str,
	) -> Result<Option<EVMTransactionReceipt>, BlockChainError>;
}
