//! Delayed block scheduling.
//!
//! The work list is derived from the current tip alone on every tick. Nothing is
//! remembered between ticks, so a height may be evaluated more than once; the
//! recorder absorbs the repeats.

use crate::{models::Configuration, services::monitor::snapshot::DelayIndex};

/// A delayed height to evaluate and the configurations to evaluate it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWork {
	pub target_height: u64,
	pub block_delay: u64,
	pub configurations: Vec<Configuration>,
}

/// Computes the delayed work for a new tip
///
/// Every delay `d` with `current_height >= d` yields the height `current_height - d`,
/// in ascending delay order. Delays longer than the chain yield nothing.
pub fn pending_work(current_height: u64, delay_index: &DelayIndex) -> Vec<PendingWork> {
	delay_index
		.iter()
		.filter_map(|(&block_delay, configurations)| {
			current_height
				.checked_sub(block_delay)
				.map(|target_height| PendingWork {
					target_height,
					block_delay,
					configurations: configurations.clone(),
				})
		})
		.collect()
}
