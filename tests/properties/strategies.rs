use alloy::primitives::U256;
use ethereum_tx_monitor::models::Configuration;
use proptest::{option, prelude::*};

const MAX_CONFIGURATIONS: usize = 20;
const MAX_BLOCK_DELAY: u64 = 64;

/// Any 256-bit unsigned integer, built from four random limbs
pub fn u256_strategy() -> impl Strategy<Value = U256> {
	any::<[u64; 4]>().prop_map(U256::from_limbs)
}

/// Hex EVM addresses in mixed case
pub fn address_strategy() -> impl Strategy<Value = String> {
	"[0-9a-fA-F]{40}".prop_map(|hex| format!("0x{}", hex))
}

/// Active configurations with distinct ids and arbitrary block delays
pub fn configurations_strategy() -> impl Strategy<Value = Vec<Configuration>> {
	prop::collection::vec(
		(option::weighted(0.5, 1..=MAX_BLOCK_DELAY), any::<bool>()),
		0..MAX_CONFIGURATIONS,
	)
	.prop_map(|entries| {
		entries
			.into_iter()
			.enumerate()
			.map(|(i, (delay, active))| Configuration {
				id: i as u64 + 1,
				name: format!("configuration {}", i + 1),
				active,
				block_delay: delay.unwrap_or(0),
				..Default::default()
			})
			.collect()
	})
}
