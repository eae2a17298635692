//! Chain access and process settings.
//!
//! Unlike filter configurations these are read from the environment (after `.env`
//! and CLI overrides have been applied), so the loader works over a variable lookup
//! function rather than a directory.

use std::{collections::HashMap, path::PathBuf, time::Duration};

use crate::{
	models::{config::error::ConfigError, Network, ReceiptPolicy, RpcEndpoint},
	utils::{
		constants::{
			DEFAULT_BLOCK_POLL_SCHEDULE, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_POLL_SCHEDULE,
			DEFAULT_DATA_DIR, DEFAULT_ETHEREUM_NETWORK, DEFAULT_MAX_PAST_BLOCKS,
			DEFAULT_REQUEST_DELAY_MS, PLACEHOLDER_INFURA_API_KEY,
		},
		env_var_non_empty, parse_var_or,
	},
};

fn invalid_setting(msg: String, name: &str) -> ConfigError {
	ConfigError::parse_error(
		msg,
		None,
		Some(HashMap::from([("variable".to_string(), name.to_string())])),
	)
}

impl Network {
	/// Builds the watched network from the process environment
	///
	/// Returns `Ok(None)` when no provider is configured, in which case the monitor
	/// runs in degraded mode without a block source.
	pub fn from_env() -> Result<Option<Self>, ConfigError> {
		Self::from_vars(env_var_non_empty)
	}

	/// Builds the watched network from the given variable lookup
	///
	/// `RPC_URL` (comma separated, in priority order) wins over an Infura endpoint
	/// built from `INFURA_API_KEY` and `ETHEREUM_NETWORK`.
	pub fn from_vars<F>(lookup: F) -> Result<Option<Self>, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let name = lookup("ETHEREUM_NETWORK")
			.map(|n| n.to_lowercase())
			.unwrap_or_else(|| DEFAULT_ETHEREUM_NETWORK.to_string());

		let rpc_urls: Vec<RpcEndpoint> = match lookup("RPC_URL") {
			Some(urls) => urls
				.split(',')
				.map(str::trim)
				.filter(|url| !url.is_empty())
				.map(RpcEndpoint::new)
				.collect(),
			None => match lookup("INFURA_API_KEY") {
				Some(key) if key != PLACEHOLDER_INFURA_API_KEY => vec![RpcEndpoint::new(format!(
					"https://{}.infura.io/v3/{}",
					name, key
				))],
				_ => Vec::new(),
			},
		};

		if rpc_urls.is_empty() {
			return Ok(None);
		}

		for endpoint in &rpc_urls {
			let parsed = url::Url::parse(endpoint.as_str()).map_err(|e| {
				ConfigError::validation_error(
					format!("Invalid RPC URL: {}", endpoint),
					Some(Box::new(e)),
					None,
				)
			})?;
			if !matches!(parsed.scheme(), "http" | "https") {
				return Err(ConfigError::validation_error(
					format!("RPC URL must use http or https: {}", endpoint),
					None,
					None,
				));
			}
		}

		let cron_schedule = lookup("BLOCK_POLL_SCHEDULE")
			.unwrap_or_else(|| DEFAULT_BLOCK_POLL_SCHEDULE.to_string());
		let max_past_blocks = parse_var_or(&lookup, "MAX_PAST_BLOCKS", DEFAULT_MAX_PAST_BLOCKS)
			.map_err(|e| invalid_setting(e, "MAX_PAST_BLOCKS"))?;

		if max_past_blocks == 0 {
			return Err(ConfigError::validation_error(
				"MAX_PAST_BLOCKS must be at least 1",
				None,
				None,
			));
		}

		Ok(Some(Self {
			slug: format!("ethereum_{}", name),
			name,
			rpc_urls,
			cron_schedule,
			max_past_blocks,
		}))
	}
}

/// Process-wide settings for the monitor
#[derive(Debug, Clone)]
pub struct MonitorSettings {
	/// Directory holding filter configuration files
	pub config_dir: PathBuf,
	/// Directory holding recorded transactions
	pub data_dir: PathBuf,
	/// Schedule used to look for configuration changes
	pub config_poll_schedule: String,
	/// Delay before every per-transaction detail request
	pub request_delay: Duration,
	/// When receipts are fetched for matched transactions
	pub receipt_policy: ReceiptPolicy,
	/// Watched chain; `None` runs the monitor without a block source
	pub network: Option<Network>,
}

impl Default for MonitorSettings {
	fn default() -> Self {
		Self {
			config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
			data_dir: PathBuf::from(DEFAULT_DATA_DIR),
			config_poll_schedule: DEFAULT_CONFIG_POLL_SCHEDULE.to_string(),
			request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
			receipt_policy: ReceiptPolicy::default(),
			network: None,
		}
	}
}

impl MonitorSettings {
	/// Reads all settings from the process environment
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_vars(env_var_non_empty)
	}

	/// Reads all settings through the given variable lookup
	pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let request_delay_ms =
			parse_var_or(&lookup, "REQUEST_DELAY_MS", DEFAULT_REQUEST_DELAY_MS)
				.map_err(|e| invalid_setting(e, "REQUEST_DELAY_MS"))?;
		let receipt_policy = parse_var_or(&lookup, "RECEIPT_POLICY", ReceiptPolicy::default())
			.map_err(|e| invalid_setting(e, "RECEIPT_POLICY"))?;

		Ok(Self {
			config_dir: lookup("CONFIG_DIR")
				.map(PathBuf::from)
				.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
			data_dir: lookup("DATA_DIR")
				.map(PathBuf::from)
				.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
			config_poll_schedule: lookup("CONFIG_POLL_SCHEDULE")
				.unwrap_or_else(|| DEFAULT_CONFIG_POLL_SCHEDULE.to_string()),
			request_delay: Duration::from_millis(request_delay_ms),
			receipt_policy,
			network: Network::from_vars(&lookup)?,
		})
	}
}
