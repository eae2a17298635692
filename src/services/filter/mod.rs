//! Transaction filtering functionality.
//!
//! Implements the matching predicate applied to every transaction of an evaluated
//! block, along with the EVM helper functions it relies on.

mod filters;

pub use filters::{evm_helpers, EVMTransactionFilter};
