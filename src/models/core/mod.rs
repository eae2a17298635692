//! Core domain models for the transaction monitoring system.
//!
//! This module contains the fundamental data structures that represent:
//! - Configurations: user-defined transaction filters
//! - Transaction records: matched transactions as they are stored
//! - Networks: blockchain data source definitions and connection details

mod configuration;
mod network;
mod transaction_record;

pub use configuration::Configuration;
pub use network::{redact_url, Network, ReceiptPolicy, RpcEndpoint};
pub use transaction_record::{
	Page, Pagination, TransactionQuery, TransactionRecord, TransactionStatus,
};
