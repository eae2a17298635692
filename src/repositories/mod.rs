//! Repository implementations for configuration and transaction data.
//!
//! This module provides storage and retrieval for:
//! - Filter configurations, with change notifications for hot reload
//! - Matched transaction records, written once per transaction hash

mod configuration;
mod error;
mod transaction;

pub use configuration::{
	directory_fingerprint, ConfigurationChange, ConfigurationChangeKind,
	ConfigurationRepositoryTrait, FileConfigurationRepository, InMemoryConfigurationRepository,
};
pub use error::RepositoryError;
pub use transaction::{
	FileTransactionRepository, InMemoryTransactionRepository, TransactionRepositoryTrait,
	TransactionService,
};
