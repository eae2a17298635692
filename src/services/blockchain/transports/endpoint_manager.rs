//! Manages the rotation of blockchain RPC endpoints
//!
//! Requests go to the active URL. Rate limiting or a network failure rotates to the next
//! fallback URL that passes a connection check, and the request is retried there. Each
//! URL is tried at most once per request.
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};

use crate::{
	models::redact_url,
	services::blockchain::transports::{RotatingTransport, TransportError, ROTATE_ON_ERROR_CODES},
};

/// Manages the rotation of blockchain RPC endpoints
///
/// Cloning shares the active URL and fallback list between clones.
#[derive(Clone, Debug)]
pub struct EndpointManager {
	pub active_url: Arc<RwLock<String>>,
	pub fallback_urls: Arc<RwLock<Vec<String>>>,
	client: ClientWithMiddleware,
	rotation_lock: Arc<Mutex<()>>,
}

/// Outcome of one attempt on one URL
#[derive(Debug)]
enum SingleRequestAttemptOutcome {
	/// Got a response; the status may still be an error
	Success(reqwest::Response),
	/// Error during send (connection, timeout)
	NetworkError(reqwest_middleware::Error),
	/// Error serializing the request body
	SerializationError(TransportError),
}

impl EndpointManager {
	pub fn new(client: ClientWithMiddleware, active_url: &str, fallback_urls: Vec<String>) -> Self {
		Self {
			active_url: Arc::new(RwLock::new(active_url.to_string())),
			fallback_urls: Arc::new(RwLock::new(fallback_urls)),
			rotation_lock: Arc::new(Mutex::new(())),
			client,
		}
	}

	/// Replaces the HTTP client, e.g. to install a different retry policy
	pub fn update_client(&mut self, client: ClientWithMiddleware) {
		self.client = client;
	}

	/// Rotates to the first fallback URL that accepts a connection
	///
	/// The previously active URL moves to the back of the fallback list. Fallbacks
	/// that fail the connection check are left in place for later rotations.
	pub async fn try_rotate_url<T: RotatingTransport>(
		&self,
		transport: &T,
	) -> Result<String, TransportError> {
		let _guard = self.rotation_lock.lock().await;
		let initial_active_url = self.active_url.read().await.clone();
		let candidates: Vec<String> = self
			.fallback_urls
			.read()
			.await
			.iter()
			.filter(|url| **url != initial_active_url)
			.cloned()
			.collect();

		if candidates.is_empty() {
			return Err(TransportError::url_rotation(
				"No fallback URLs available",
				None,
				Some(HashMap::from([(
					"active_url".to_string(),
					redact_url(&initial_active_url),
				)])),
			));
		}

		let mut last_error = None;
		for new_url in candidates {
			tracing::debug!(url = %redact_url(&new_url), "Trying fallback RPC endpoint");

			if let Err(e) = transport.try_connect(&new_url).await {
				tracing::warn!(url = %redact_url(&new_url), error = %e, "Fallback RPC endpoint unavailable");
				last_error = Some(e);
				continue;
			}

			transport.update_client(&new_url).await.map_err(|e| {
				TransportError::url_rotation(
					"Failed to update transport client",
					Some(e.into()),
					Some(HashMap::from([(
						"url".to_string(),
						redact_url(&new_url),
					)])),
				)
			})?;

			let mut active_url_guard = self.active_url.write().await;
			let mut fallback_urls_guard = self.fallback_urls.write().await;
			fallback_urls_guard.retain(|url| *url != new_url);
			fallback_urls_guard.push(initial_active_url.clone());
			*active_url_guard = new_url.clone();

			tracing::info!(
				from = %redact_url(&initial_active_url),
				to = %redact_url(&new_url),
				"Rotated RPC endpoint"
			);
			return Ok(new_url);
		}

		Err(TransportError::url_rotation(
			"All fallback URLs failed to connect",
			last_error.map(Into::into),
			None,
		))
	}

	async fn try_request_on_url<P>(
		&self,
		url: &str,
		transport: &impl RotatingTransport,
		method: &str,
		params: Option<P>,
	) -> SingleRequestAttemptOutcome
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		let request_body = transport.customize_request(method, params).await;

		let request_body_str = match serde_json::to_string(&request_body) {
			Ok(body) => body,
			Err(e) => {
				return SingleRequestAttemptOutcome::SerializationError(
					TransportError::request_serialization(
						"Failed to serialize request JSON",
						Some(Box::new(e)),
						None,
					),
				);
			}
		};

		match self
			.client
			.post(url)
			.header("Content-Type", "application/json")
			.body(request_body_str)
			.send()
			.await
		{
			Ok(response) => SingleRequestAttemptOutcome::Success(response),
			Err(network_error) => SingleRequestAttemptOutcome::NetworkError(network_error),
		}
	}

	/// Sends a raw request, rotating to fallback URLs on rate limiting or network errors
	///
	/// Other HTTP errors are returned without rotation. At most one rotation per
	/// known URL is attempted, so a request never loops over the same endpoints.
	pub async fn send_raw_request<
		T: RotatingTransport,
		P: Into<Value> + Send + Clone + Serialize,
	>(
		&self,
		transport: &T,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError> {
		let max_rotations = self.fallback_urls.read().await.len();
		let mut rotations = 0;

		loop {
			let current_url = self.active_url.read().await.clone();
			let redacted = redact_url(&current_url);
			let metadata = HashMap::from([
				("url".to_string(), redacted.clone()),
				("method".to_string(), method.to_string()),
			]);

			match self
				.try_request_on_url(&current_url, transport, method, params.clone())
				.await
			{
				SingleRequestAttemptOutcome::Success(response) => {
					let status = response.status();
					if status.is_success() {
						return response.json().await.map_err(|e| {
							TransportError::response_parse(
								"Failed to parse JSON response",
								Some(Box::new(e)),
								Some(metadata),
							)
						});
					}

					let error_body = response.text().await.unwrap_or_default();
					if !ROTATE_ON_ERROR_CODES.contains(&status.as_u16()) || rotations >= max_rotations
					{
						return Err(TransportError::http(
							status,
							redacted,
							error_body,
							None,
							Some(metadata),
						));
					}

					tracing::warn!(url = %redacted, %status, "RPC endpoint rejected request, rotating");
					rotations += 1;
					if let Err(rotation_error) = self.try_rotate_url(transport).await {
						return Err(TransportError::http(
							status,
							redacted,
							error_body,
							Some(Box::new(rotation_error)),
							Some(metadata),
						));
					}
				}
				SingleRequestAttemptOutcome::NetworkError(network_error) => {
					if rotations >= max_rotations {
						return Err(TransportError::network(
							"Request failed on every RPC endpoint",
							Some(Box::new(network_error)),
							Some(metadata),
						));
					}

					tracing::warn!(url = %redacted, error = %network_error, "RPC endpoint unreachable, rotating");
					rotations += 1;
					if let Err(rotation_error) = self.try_rotate_url(transport).await {
						return Err(TransportError::network(
							network_error.to_string(),
							Some(Box::new(rotation_error)),
							Some(metadata),
						));
					}
				}
				SingleRequestAttemptOutcome::SerializationError(serialization_error) => {
					return Err(serialization_error);
				}
			}
		}
	}
}
