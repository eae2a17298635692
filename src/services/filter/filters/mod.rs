//! Transaction filter implementations.
//!
//! Only EVM-compatible chains are supported.

mod evm {
	pub mod filter;
	pub mod helpers;
}

pub use evm::{filter::EVMTransactionFilter, helpers as evm_helpers};
