//! Mock implementations and helpers shared by the integration tests.
//!
//! - [`MockEvmClient`] - mockall implementation of the blockchain client
//! - [`MockBlockSubscriber`] - mockall implementation of the block subscription
//! - [`ChannelSubscriber`] - subscription double that lets a test push heights

use std::{
	future::Future,
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration,
};

use async_trait::async_trait;
use ethereum_tx_monitor::{
	models::{EVMBlock, EVMTransaction, EVMTransactionReceipt, Network},
	services::{
		blockchain::{BlockChainClient, BlockChainError},
		blockwatcher::{BlockSubscriber, BlockWatcherError},
	},
	utils::tests::builders::network::NetworkBuilder,
};
use mockall::mock;
use mockito::{Mock, Server};
use tokio::sync::{mpsc, Mutex};

mock! {
	/// Mock implementation of the blockchain client.
	///
	/// Simulates node responses without network calls.
	pub EvmClient {}

	#[async_trait]
	impl BlockChainClient for EvmClient {
		async fn get_latest_block_number(&self) -> Result<u64, BlockChainError>;
		async fn get_block(
			&self,
			block_number: u64,
			full_transactions: bool,
		) -> Result<Option<EVMBlock>, BlockChainError>;
		async fn get_transaction(
			&self,
			transaction_hash: &str,
		) -> Result<Option<EVMTransaction>, BlockChainError>;
		async fn get_transaction_receipt(
			&self,
			transaction_hash: &str,
		) -> Result<Option<EVMTransactionReceipt>, BlockChainError>;
	}
}

mock! {
	pub BlockSubscriber {}

	#[async_trait]
	impl BlockSubscriber for BlockSubscriber {
		async fn subscribe_new_blocks(
			&self,
			start_after: u64,
			sender: mpsc::Sender<u64>,
		) -> Result<(), BlockWatcherError>;
		async fn unsubscribe_new_blocks(&self) -> Result<(), BlockWatcherError>;
	}
}

/// Subscription double that hands heights to the monitor on demand
#[derive(Default)]
pub struct ChannelSubscriber {
	sender: Mutex<Option<mpsc::Sender<u64>>>,
	start_after: Mutex<Option<u64>>,
	subscriptions: AtomicUsize,
	unsubscriptions: AtomicUsize,
}

impl ChannelSubscriber {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sends `height` to the current subscriber; false when there is none
	pub async fn emit(&self, height: u64) -> bool {
		match self.sender.lock().await.as_ref() {
			Some(sender) => sender.send(height).await.is_ok(),
			None => false,
		}
	}

	pub async fn start_after(&self) -> Option<u64> {
		*self.start_after.lock().await
	}

	pub async fn is_subscribed(&self) -> bool {
		self.sender.lock().await.is_some()
	}

	pub fn subscriptions(&self) -> usize {
		self.subscriptions.load(Ordering::SeqCst)
	}

	pub fn unsubscriptions(&self) -> usize {
		self.unsubscriptions.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl BlockSubscriber for ChannelSubscriber {
	async fn subscribe_new_blocks(
		&self,
		start_after: u64,
		sender: mpsc::Sender<u64>,
	) -> Result<(), BlockWatcherError> {
		*self.start_after.lock().await = Some(start_after);
		*self.sender.lock().await = Some(sender);
		self.subscriptions.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn unsubscribe_new_blocks(&self) -> Result<(), BlockWatcherError> {
		self.sender.lock().await.take();
		self.unsubscriptions.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

/// Polls `condition` until it holds, failing the test after two seconds
pub async fn wait_until<F, Fut>(mut condition: F)
where
	F: FnMut() -> Fut,
	Fut: Future<Output = bool>,
{
	let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
	while !condition().await {
		assert!(
			tokio::time::Instant::now() < deadline,
			"condition not met within two seconds"
		);
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
}

pub fn create_evm_test_network_with_urls(urls: Vec<&str>) -> Network {
	let mut builder = NetworkBuilder::new().rpc_url(urls[0]);
	for url in &urls[1..] {
		builder = builder.add_rpc_url(url);
	}
	builder.build()
}

/// Answers the connection check every client performs on construction
pub async fn create_evm_valid_server_mock_network_response(server: &mut Server) -> Mock {
	server
		.mock("POST", "/")
		.match_body(mockito::Matcher::PartialJson(serde_json::json!({
			"method": "net_version"
		})))
		.with_header("content-type", "application/json")
		.with_body(r#"{"jsonrpc":"2.0","id":1,"result":"1"}"#)
		.expect_at_least(1)
		.create_async()
		.await
}
