//! Domain models and data structures for transaction monitoring.
//!
//! This module contains all the core data structures used throughout the application:
//!
//! - `blockchain`: EVM blocks, transactions and receipts as returned by JSON-RPC
//! - `config`: Configuration loading and validation
//! - `core`: Core domain models (Configuration, TransactionRecord, Network)

mod blockchain;
mod config;
mod core;

// Re-export blockchain types
pub use blockchain::{
	evm::{
		EVMBaseBlock, EVMBaseReceipt, EVMBaseTransaction, EVMBlock, EVMBlockTransactions,
		EVMTransaction, EVMTransactionReceipt,
	},
	ProcessedBlock,
};

// Re-export core types
pub use core::{
	redact_url, Configuration, Network, Page, Pagination, ReceiptPolicy, RpcEndpoint,
	TransactionQuery, TransactionRecord, TransactionStatus,
};

// Re-export config types
pub use config::{is_valid_address, ConfigError, ConfigLoader, MonitorSettings};
