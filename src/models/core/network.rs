//! Network (blockchain data source) settings.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// An RPC endpoint URL
///
/// Provider URLs routinely embed API keys, so the value is wiped on drop and never
/// printed by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct RpcEndpoint(Zeroizing<String>);

impl RpcEndpoint {
	pub fn new(url: impl Into<String>) -> Self {
		Self(Zeroizing::new(url.into()))
	}

	/// The full URL, including any credentials it carries
	pub fn as_str(&self) -> &str {
		self.0.as_str()
	}

	/// Scheme and host only, safe to log
	pub fn redacted(&self) -> String {
		redact_url(self.as_str())
	}
}

/// Reduces a URL to its scheme and host so it can be logged without credentials
pub fn redact_url(url: &str) -> String {
	match url::Url::parse(url) {
		Ok(url) => format!(
			"{}://{}",
			url.scheme(),
			url.host_str().unwrap_or("unknown-host")
		),
		Err(_) => "<invalid url>".to_string(),
	}
}

impl fmt::Debug for RpcEndpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("RpcEndpoint").field(&self.redacted()).finish()
	}
}

impl fmt::Display for RpcEndpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.redacted())
	}
}

/// When to fetch a receipt for a matched transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptPolicy {
	/// Only when the configuration or the transaction needs receipt data
	#[default]
	OnDemand,
	/// For every matched transaction, so gas used and status always come from the receipt
	Always,
}

impl FromStr for ReceiptPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().replace('-', "_").as_str() {
			"on_demand" | "ondemand" => Ok(Self::OnDemand),
			"always" => Ok(Self::Always),
			other => Err(format!(
				"Unknown receipt policy '{}', expected 'on_demand' or 'always'",
				other
			)),
		}
	}
}

impl fmt::Display for ReceiptPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::OnDemand => write!(f, "on_demand"),
			Self::Always => write!(f, "always"),
		}
	}
}

/// Connection and polling settings for the watched chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
	/// Short identifier used in logs, e.g. "ethereum_mainnet"
	pub slug: String,
	/// Human-readable network name, e.g. "mainnet"
	pub name: String,
	/// RPC endpoints in priority order; the first reachable one becomes active
	pub rpc_urls: Vec<RpcEndpoint>,
	/// Cron expression (with seconds) used to poll the chain tip
	pub cron_schedule: String,
	/// Maximum number of heights handed out by one poll when the watcher falls behind
	pub max_past_blocks: u64,
}
