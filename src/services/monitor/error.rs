//! Monitor error types and handling.
//!
//! Errors raised while driving the monitor: lifecycle misuse, subscription setup,
//! block retrieval, configuration reloads and recording of matches.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors raised by the monitor
#[derive(ThisError, Debug)]
pub enum MonitorError {
	/// An operation was requested in a state that does not allow it
	#[error("State error: {0}")]
	StateError(ErrorContext),

	/// The chain tip could not be read or the new block subscription failed
	#[error("Subscription error: {0}")]
	SubscriptionError(ErrorContext),

	/// A block could not be retrieved
	#[error("Block error: {0}")]
	BlockError(ErrorContext),

	/// The configuration store could not be read
	#[error("Configuration error: {0}")]
	ConfigurationError(ErrorContext),

	/// A matched transaction could not be recorded
	#[error("Record error: {0}")]
	RecordError(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl MonitorError {
	// State error
	pub fn state_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::StateError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Subscription error
	pub fn subscription_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::SubscriptionError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Block error
	pub fn block_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::BlockError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Configuration error
	pub fn configuration_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ConfigurationError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Record error
	pub fn record_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::RecordError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for MonitorError {
	fn trace_id(&self) -> String {
		match self {
			Self::StateError(ctx) => ctx.trace_id.clone(),
			Self::SubscriptionError(ctx) => ctx.trace_id.clone(),
			Self::BlockError(ctx) => ctx.trace_id.clone(),
			Self::ConfigurationError(ctx) => ctx.trace_id.clone(),
			Self::RecordError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
