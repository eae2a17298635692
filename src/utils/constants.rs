//! Constants shared across the application.

/// Default directory holding one JSON file per filter configuration
pub const DEFAULT_CONFIG_DIR: &str = "config/configurations";

/// Default directory holding one JSON file per recorded transaction
pub const DEFAULT_DATA_DIR: &str = "data/transactions";

/// Default schedule used to poll the chain tip (every 12 seconds, one slot)
pub const DEFAULT_BLOCK_POLL_SCHEDULE: &str = "*/12 * * * * *";

/// Default schedule used to look for configuration changes on disk
pub const DEFAULT_CONFIG_POLL_SCHEDULE: &str = "*/10 * * * * *";

/// Default cap on the number of heights handed out by a single poll
pub const DEFAULT_MAX_PAST_BLOCKS: u64 = 10;

/// Default delay before every per-transaction detail request
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 200;

/// Default Ethereum network used when building an Infura endpoint
pub const DEFAULT_ETHEREUM_NETWORK: &str = "mainnet";

/// Placeholder shipped in sample `.env` files, treated as a missing key
pub const PLACEHOLDER_INFURA_API_KEY: &str = "YOUR_INFURA_API_KEY";

/// Capacity of the queue between the block watcher and the monitor worker
pub const BLOCK_QUEUE_CAPACITY: usize = 256;

/// Capacity of the configuration change broadcast channel
pub const CONFIGURATION_CHANNEL_CAPACITY: usize = 64;

/// Page size used when no explicit limit is requested
pub const DEFAULT_PAGE_SIZE: u64 = 20;
