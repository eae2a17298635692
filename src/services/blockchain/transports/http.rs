//! HTTP transport implementation for blockchain interactions.
//!
//! Generic JSON-RPC over HTTP client with:
//! - Multiple RPC endpoints with automatic failover
//! - Retries of transient failures through `reqwest-retry`
//! - Connection checks before an endpoint is used

use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use crate::{
	models::{redact_url, Network},
	services::blockchain::transports::{
		BlockchainTransport, EndpointManager, RotatingTransport, TransientErrorRetryStrategy,
		TransportError,
	},
	utils::http::{create_base_http_client, create_retryable_http_client, HttpRetryConfig},
};

/// Basic HTTP transport client for blockchain interactions
///
/// The client is cheap to clone and clones share the endpoint state.
#[derive(Clone, Debug)]
pub struct HttpTransportClient {
	/// Retryable HTTP client for making requests
	pub client: ClientWithMiddleware,
	/// Manages RPC endpoint rotation and request handling
	endpoint_manager: EndpointManager,
	/// The stringified JSON-RPC payload used to check a connection
	test_connection_payload: Option<String>,
}

fn test_request(test_connection_payload: &Option<String>) -> Result<Value, anyhow::Error> {
	match test_connection_payload {
		Some(payload) => {
			serde_json::from_str(payload).context("Failed to parse test payload as JSON")
		}
		None => Ok(json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": "net_version",
			"params": []
		})),
	}
}

impl HttpTransportClient {
	/// Creates a new HTTP transport client
	///
	/// The configured URLs are tried in order; the first one that answers the test
	/// request becomes active and the others become fallbacks.
	///
	/// # Arguments
	/// * `network` - Network configuration containing the RPC URLs
	/// * `test_connection_payload` - Optional JSON-RPC payload for the connection check (default is net_version)
	pub async fn new(
		network: &Network,
		test_connection_payload: Option<String>,
	) -> Result<Self, anyhow::Error> {
		let retryable_client = create_retryable_http_client(
			&HttpRetryConfig::default(),
			create_base_http_client().context("Failed to create base HTTP client")?,
			Some(TransientErrorRetryStrategy),
		);
		let test_request = test_request(&test_connection_payload)?;

		for rpc_url in network.rpc_urls.iter() {
			let url = match Url::parse(rpc_url.as_str()) {
				Ok(url) => url,
				Err(_) => continue,
			};

			match retryable_client
				.post(url)
				.json(&test_request)
				.send()
				.await
			{
				Ok(response) if response.status().is_success() => {
					let fallback_urls: Vec<String> = network
						.rpc_urls
						.iter()
						.filter(|other| *other != rpc_url)
						.map(|other| other.as_str().to_string())
						.collect();

					tracing::info!(
						network = %network.slug,
						url = %rpc_url,
						fallbacks = fallback_urls.len(),
						"Connected to RPC endpoint"
					);

					return Ok(Self {
						client: retryable_client.clone(),
						endpoint_manager: EndpointManager::new(
							retryable_client,
							rpc_url.as_str(),
							fallback_urls,
						),
						test_connection_payload,
					});
				}
				Ok(response) => {
					tracing::warn!(url = %rpc_url, status = %response.status(), "RPC endpoint check failed");
				}
				Err(e) => {
					tracing::warn!(url = %rpc_url, error = %e, "RPC endpoint unreachable");
				}
			}
		}

		Err(anyhow::anyhow!(
			"All RPC URLs failed to connect for network {}",
			network.slug
		))
	}
}

#[async_trait]
impl BlockchainTransport for HttpTransportClient {
	async fn get_current_url(&self) -> String {
		self.endpoint_manager.active_url.read().await.clone()
	}

	/// Sends a JSON-RPC request through the endpoint manager
	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		self.endpoint_manager
			.send_raw_request(self, method, params)
			.await
	}

	fn update_endpoint_manager_client(
		&mut self,
		client: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		self.endpoint_manager.update_client(client);
		Ok(())
	}
}

#[async_trait]
impl RotatingTransport for HttpTransportClient {
	/// Checks that an endpoint answers the test request with a success status
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		let parsed =
			Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", redact_url(url)))?;
		let test_request = test_request(&self.test_connection_payload)?;

		let response = self
			.client
			.post(parsed)
			.json(&test_request)
			.send()
			.await
			.map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", redact_url(url), e))?;

		if !response.status().is_success() {
			return Err(anyhow::anyhow!(
				"Failed to connect to {}: {}",
				redact_url(url),
				response.status().as_u16()
			));
		}
		Ok(())
	}

	/// Makes `url` the active endpoint
	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		let parsed_url =
			Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", redact_url(url)))?;
		let normalized_url = parsed_url.as_str().trim_end_matches('/');

		let mut active_url = self.endpoint_manager.active_url.write().await;
		*active_url = normalized_url.to_string();
		Ok(())
	}
}
