//! Point-in-time view of the active configurations.
//!
//! A snapshot is built once from the configuration store and never mutated. The
//! monitor installs a new one on every reload, so the live subset and the delay
//! index always describe the same set of configurations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::Configuration;

/// Configurations grouped by their block delay, ascending
pub type DelayIndex = BTreeMap<u64, Vec<Configuration>>;

/// Groups configurations with a positive block delay by that delay
///
/// Configurations keep their relative order inside each group.
pub fn build_delay_index(configurations: &[Configuration]) -> DelayIndex {
	let mut index = DelayIndex::new();
	for configuration in configurations.iter().filter(|c| !c.is_live()) {
		index
			.entry(configuration.block_delay)
			.or_default()
			.push(configuration.clone());
	}
	index
}

/// Immutable set of active configurations, partitioned by block delay
#[derive(Debug, Clone, Default)]
pub struct ConfigurationSnapshot {
	configurations: Vec<Configuration>,
	live: Vec<Configuration>,
	delay_index: DelayIndex,
	loaded_at: DateTime<Utc>,
}

impl ConfigurationSnapshot {
	/// Builds a snapshot from the configurations returned by the store
	///
	/// Inactive configurations are dropped and the rest are ordered by id, which is
	/// the order in which they are evaluated.
	pub fn load(configurations: Vec<Configuration>) -> Self {
		let mut configurations: Vec<Configuration> =
			configurations.into_iter().filter(|c| c.active).collect();
		configurations.sort_by_key(|c| c.id);

		let live = configurations
			.iter()
			.filter(|c| c.is_live())
			.cloned()
			.collect();
		let delay_index = build_delay_index(&configurations);

		Self {
			configurations,
			live,
			delay_index,
			loaded_at: Utc::now(),
		}
	}

	/// Every active configuration
	pub fn configurations(&self) -> &[Configuration] {
		&self.configurations
	}

	/// Configurations evaluated against the live tip
	pub fn live(&self) -> &[Configuration] {
		&self.live
	}

	/// Configurations evaluated against older blocks, by delay
	pub fn delay_index(&self) -> &DelayIndex {
		&self.delay_index
	}

	pub fn loaded_at(&self) -> DateTime<Utc> {
		self.loaded_at
	}

	pub fn len(&self) -> usize {
		self.configurations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.configurations.is_empty()
	}
}
