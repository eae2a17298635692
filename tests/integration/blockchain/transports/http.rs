use mockito::{Matcher, Server};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::integration::mocks::{
	create_evm_test_network_with_urls, create_evm_valid_server_mock_network_response,
};
use ethereum_tx_monitor::services::blockchain::{
	BlockchainTransport, EVMTransportClient, EndpointManager, RotatingTransport, TransportError,
};

// Transport whose connection check fails for the URLs in `unreachable`
#[derive(Clone)]
struct MockTransport {
	current_url: Arc<RwLock<String>>,
	unreachable: Vec<String>,
}

impl MockTransport {
	fn new(unreachable: Vec<&str>) -> Self {
		Self {
			current_url: Arc::new(RwLock::new(String::new())),
			unreachable: unreachable.into_iter().map(String::from).collect(),
		}
	}
}

#[async_trait::async_trait]
impl BlockchainTransport for MockTransport {
	async fn get_current_url(&self) -> String {
		self.current_url.read().await.clone()
	}

	async fn send_raw_request<P: Into<Value> + Send + Clone + Serialize>(
		&self,
		_method: &str,
		_params: Option<P>,
	) -> Result<Value, TransportError> {
		Ok(json!({"jsonrpc": "2.0", "result": "mocked_response", "id": 1}))
	}

	fn update_endpoint_manager_client(
		&mut self,
		_: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		Ok(())
	}
}

#[async_trait::async_trait]
impl RotatingTransport for MockTransport {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		if self.unreachable.iter().any(|u| u == url) {
			Err(anyhow::anyhow!("connection refused"))
		} else {
			Ok(())
		}
	}

	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		*self.current_url.write().await = url.to_string();
		Ok(())
	}
}

fn plain_client() -> ClientWithMiddleware {
	ClientBuilder::new(reqwest::Client::new()).build()
}

#[tokio::test]
async fn test_rotation_skips_unreachable_fallback() {
	let manager = EndpointManager::new(
		plain_client(),
		"https://primary.example",
		vec![
			"https://down.example".to_string(),
			"https://backup.example".to_string(),
		],
	);
	let transport = MockTransport::new(vec!["https://down.example"]);

	let rotated = manager.try_rotate_url(&transport).await.unwrap();

	assert_eq!(rotated, "https://backup.example");
	assert_eq!(*manager.active_url.read().await, "https://backup.example");
	assert_eq!(
		*manager.fallback_urls.read().await,
		vec![
			"https://down.example".to_string(),
			"https://primary.example".to_string()
		]
	);
	assert_eq!(transport.get_current_url().await, "https://backup.example");
}

#[tokio::test]
async fn test_rotation_without_fallbacks_fails() {
	let manager = EndpointManager::new(plain_client(), "https://primary.example", vec![]);
	let transport = MockTransport::new(vec![]);

	let result = manager.try_rotate_url(&transport).await;

	assert!(matches!(result, Err(TransportError::UrlRotation(_))));
	assert_eq!(*manager.active_url.read().await, "https://primary.example");
}

#[tokio::test]
async fn test_rotation_fails_when_every_fallback_is_down() {
	let manager = EndpointManager::new(
		plain_client(),
		"https://primary.example",
		vec!["https://down.example".to_string()],
	);
	let transport = MockTransport::new(vec!["https://down.example"]);

	assert!(manager.try_rotate_url(&transport).await.is_err());
	assert_eq!(*manager.active_url.read().await, "https://primary.example");
}

#[tokio::test]
async fn test_evm_transport_connects_to_first_healthy_endpoint() {
	let mut down = Server::new_async().await;
	let mut up = Server::new_async().await;
	let _down_check = down
		.mock("POST", "/")
		.with_status(400)
		.create_async()
		.await;
	let _up_check = create_evm_valid_server_mock_network_response(&mut up).await;

	let network = create_evm_test_network_with_urls(vec![down.url().as_str(), up.url().as_str()]);
	let transport = EVMTransportClient::new(&network).await.unwrap();

	assert_eq!(transport.get_current_url().await, up.url());
}

#[tokio::test]
async fn test_evm_transport_sends_json_rpc_request() {
	let mut server = Server::new_async().await;
	let _check = create_evm_valid_server_mock_network_response(&mut server).await;
	let request_mock = server
		.mock("POST", "/")
		.match_body(Matcher::Json(json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": "eth_getBlockByNumber",
			"params": ["0x1", false]
		})))
		.with_header("content-type", "application/json")
		.with_body(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)
		.create_async()
		.await;

	let network = create_evm_test_network_with_urls(vec![server.url().as_str()]);
	let transport = EVMTransportClient::new(&network).await.unwrap();

	let response = transport
		.send_raw_request("eth_getBlockByNumber", Some(json!(["0x1", false])))
		.await
		.unwrap();

	assert!(response["result"].is_null());
	request_mock.assert();
}
