//! Ethereum transaction monitoring service.
//!
//! This library watches an Ethereum network for new blocks, evaluates every transaction
//! against a hot-reloadable set of filter configurations and records each matching
//! transaction exactly once. It includes:
//!
//! - Filter configurations loaded from JSON files and reloaded on change
//! - Live and delayed (N confirmations behind the tip) block evaluation
//! - Idempotent persistence of matched transactions
//! - JSON-RPC access to the chain with endpoint failover and retries
//!
//! # Module Structure
//!
//! - `bootstrap`: Bootstraps the application
//! - `models`: Data structures for configurations, records and blockchain data
//! - `repositories`: Configuration and transaction storage
//! - `services`: Core monitoring logic and blockchain interaction
//! - `utils`: Common utilities and helper functions

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;
