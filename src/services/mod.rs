//! Core services implementing the transaction monitoring logic.
//!
//! This module contains the main service implementations:
//! - `blockchain`: JSON-RPC access to the watched chain
//! - `blockwatcher`: New-block notifications driven by polling the chain tip
//! - `filter`: The transaction matching predicate
//! - `monitor`: Snapshot management, scheduling, block processing and recording

pub mod blockchain;
pub mod blockwatcher;
pub mod filter;
pub mod monitor;
