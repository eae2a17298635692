//! Blockchain client interfaces and implementations.
//!
//! Provides the read-only chain interface used by the monitor and its JSON-RPC
//! implementation:
//!
//! - Generic blockchain client trait
//! - EVM client
//! - HTTP transport with endpoint failover
//! - Error handling for blockchain operations

mod client;
mod clients;
mod error;
mod transports;

pub use client::BlockChainClient;
pub use clients::EvmClient;
pub use error::BlockChainError;
pub use transports::{
	BlockchainTransport, EVMTransportClient, EndpointManager, HttpTransportClient,
	RotatingTransport, TransientErrorRetryStrategy, TransportError,
};
