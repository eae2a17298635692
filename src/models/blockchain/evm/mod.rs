//! Ethereum Virtual Machine (EVM) blockchain specific implementations.
//!
//! This module contains the JSON-RPC data structures for blocks, transactions and
//! receipts.

mod block;
mod receipt;
mod transaction;

pub use block::{
	BaseBlock as EVMBaseBlock, Block as EVMBlock, BlockTransactions as EVMBlockTransactions,
};
pub use receipt::{BaseReceipt as EVMBaseReceipt, TransactionReceipt as EVMTransactionReceipt};
pub use transaction::{BaseTransaction as EVMBaseTransaction, Transaction as EVMTransaction};
