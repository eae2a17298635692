//! Test helper utilities
//!
//! This module contains test helper utilities for the application.
//!
//! - `builders`: Test helper utilities for creating test instances of models
//! - `mocks`: mockall doubles for unit tests

pub mod builders {
	// Chain specific test helpers
	pub mod evm {
		pub mod block;
		pub mod receipt;
		pub mod transaction;
	}

	// Chain agnostic test helpers
	pub mod configuration;
	pub mod network;
	pub mod transaction_record;
}


pub use builders::*;
