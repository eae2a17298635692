//! Recorded transaction data structures and read-side query types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::constants::DEFAULT_PAGE_SIZE;

/// Post-execution status of a recorded transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
	/// No receipt was fetched for the transaction
	#[default]
	Unknown,
	/// The receipt reported success
	Success,
	/// The receipt reported failure
	Failure,
}

impl From<Option<bool>> for TransactionStatus {
	fn from(succeeded: Option<bool>) -> Self {
		match succeeded {
			Some(true) => Self::Success,
			Some(false) => Self::Failure,
			None => Self::Unknown,
		}
	}
}

/// A matched transaction, stored once per transaction hash
///
/// Amounts are decimal strings so that wei-scale values survive any JSON consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
	/// Configuration whose match caused the record to be written
	pub configuration_id: u64,
	/// 0x-prefixed transaction hash, lowercase
	pub transaction_hash: String,
	/// Height of the containing block
	pub block_number: u64,
	/// 0x-prefixed hash of the containing block
	pub block_hash: String,
	/// Sender address
	pub from: String,
	/// Recipient address; `None` for contract creation
	pub to: Option<String>,
	/// Transferred value in wei
	pub value: String,
	/// Gas consumed according to the receipt, or the gas limit when no receipt was fetched
	pub gas_used: String,
	/// Gas price in wei, "0" when the node did not report one
	pub gas_price: String,
	/// Call data as 0x-prefixed hex
	pub input: String,
	/// Sender nonce
	pub nonce: String,
	/// Address of the deployed contract, when the receipt reports one
	pub contract_address: Option<String>,
	/// Post-execution status
	pub status: TransactionStatus,
	/// Block time
	pub timestamp: DateTime<Utc>,
	/// The transaction exactly as received from the node
	pub raw_data: serde_json::Value,
	/// Time the record was written
	pub created_at: DateTime<Utc>,
}

/// Filter for read-side transaction queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
	/// Only return records written for this configuration
	pub configuration_id: Option<u64>,
}

impl TransactionQuery {
	/// Query for the records of a single configuration
	pub fn for_configuration(configuration_id: u64) -> Self {
		Self {
			configuration_id: Some(configuration_id),
		}
	}

	/// Whether a record satisfies this query
	pub fn matches(&self, record: &TransactionRecord) -> bool {
		self.configuration_id
			.is_none_or(|id| record.configuration_id == id)
	}
}

/// One-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
	/// Page number, starting at 1
	pub page: u64,
	/// Maximum number of items per page
	pub limit: u64,
}

impl Default for Pagination {
	fn default() -> Self {
		Self {
			page: 1,
			limit: DEFAULT_PAGE_SIZE,
		}
	}
}

impl Pagination {
	/// Creates a page request, clamping page and limit to at least 1
	pub fn new(page: u64, limit: u64) -> Self {
		Self {
			page: page.max(1),
			limit: limit.max(1),
		}
	}

	/// Number of items preceding this page
	pub fn offset(&self) -> usize {
		usize::try_from(self.page.saturating_sub(1).saturating_mul(self.limit))
			.unwrap_or(usize::MAX)
	}
}

/// A page of query results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
	/// Items on this page
	pub items: Vec<T>,
	/// Total number of items matching the query
	pub total_count: u64,
	/// Page number, starting at 1
	pub page: u64,
	/// Page size used
	pub limit: u64,
	/// Number of pages available for this page size
	pub total_pages: u64,
}

impl<T> Page<T> {
	/// Slices already ordered results into the requested page
	pub fn from_sorted(items: Vec<T>, pagination: Pagination) -> Self {
		let total_count = items.len() as u64;
		let total_pages = total_count.div_ceil(pagination.limit);
		let limit = usize::try_from(pagination.limit).unwrap_or(usize::MAX);

		let items = items
			.into_iter()
			.skip(pagination.offset())
			.take(limit)
			.collect();

		Self {
			items,
			total_count,
			page: pagination.page,
			limit: pagination.limit,
			total_pages,
		}
	}
}
