use std::{
	sync::{Arc, Mutex as StdMutex},
	time::Duration,
};

use alloy::primitives::{Address, B256, U256};
use tempfile::TempDir;

use crate::integration::mocks::{wait_until, ChannelSubscriber, MockBlockSubscriber, MockEvmClient};
use ethereum_tx_monitor::{
	models::{Configuration, EVMBlock, EVMTransaction, Pagination, ReceiptPolicy, TransactionQuery},
	repositories::{
		ConfigurationRepositoryTrait, FileTransactionRepository, InMemoryConfigurationRepository,
		InMemoryTransactionRepository, TransactionRepositoryTrait,
	},
	services::{
		blockchain::BlockChainError,
		blockwatcher::BlockWatcherError,
		monitor::{DataSource, MonitorError, MonitorService, MonitorState, PipelineConfig},
	},
	utils::tests::builders::{
		configuration::ConfigurationBuilder,
		evm::{block::BlockBuilder, transaction::TransactionBuilder},
	},
};

const REFERENCE_HEIGHT: u64 = 100;

fn pipeline_config() -> PipelineConfig {
	PipelineConfig {
		request_delay: Duration::ZERO,
		receipt_policy: ReceiptPolicy::OnDemand,
	}
}

fn transfer(byte: u8, value: u64) -> EVMTransaction {
	TransactionBuilder::new()
		.hash(B256::repeat_byte(byte))
		.from(Address::repeat_byte(0xaa))
		.to(Address::repeat_byte(0xbb))
		.value(U256::from(value))
		.build()
}

/// Block 101 carries transfers of 500, 1000 and 2000 wei; every other block is empty
fn block_at(height: u64) -> EVMBlock {
	let transactions = if height == 101 {
		vec![transfer(1, 500), transfer(2, 1_000), transfer(3, 2_000)]
	} else {
		Vec::new()
	};
	BlockBuilder::new()
		.number(height)
		.transactions(transactions)
		.build()
}

/// Client at height 100 that logs every requested block height
fn recording_client() -> (MockEvmClient, Arc<StdMutex<Vec<u64>>>) {
	let fetched = Arc::new(StdMutex::new(Vec::new()));
	let mut client = MockEvmClient::new();
	client
		.expect_get_latest_block_number()
		.returning(|| Ok(REFERENCE_HEIGHT));
	let log = fetched.clone();
	client.expect_get_block().returning(move |height, _| {
		log.lock().unwrap().push(height);
		Ok(Some(block_at(height)))
	});
	(client, fetched)
}

fn fetched_heights(fetched: &Arc<StdMutex<Vec<u64>>>) -> Vec<u64> {
	fetched.lock().unwrap().clone()
}

struct Harness<T: TransactionRepositoryTrait> {
	monitor: MonitorService<InMemoryConfigurationRepository, T>,
	configurations: Arc<InMemoryConfigurationRepository>,
	transactions: Arc<T>,
	subscriber: Arc<ChannelSubscriber>,
}

fn harness_with<T: TransactionRepositoryTrait + 'static>(
	client: MockEvmClient,
	configurations: Vec<Configuration>,
	transactions: Arc<T>,
) -> Harness<T> {
	let configuration_repository = Arc::new(InMemoryConfigurationRepository::with_configurations(
		configurations,
	));
	let subscriber = Arc::new(ChannelSubscriber::new());
	let monitor = MonitorService::new(
		configuration_repository.clone(),
		transactions.clone(),
		Some(DataSource {
			client: Arc::new(client),
			subscriber: subscriber.clone(),
		}),
		pipeline_config(),
	);
	Harness {
		monitor,
		configurations: configuration_repository,
		transactions,
		subscriber,
	}
}

fn harness(
	client: MockEvmClient,
	configurations: Vec<Configuration>,
) -> Harness<InMemoryTransactionRepository> {
	harness_with(
		client,
		configurations,
		Arc::new(InMemoryTransactionRepository::new()),
	)
}

async fn stored_count<T: TransactionRepositoryTrait>(transactions: &T) -> u64 {
	transactions
		.list(&TransactionQuery::default(), Pagination::default())
		.await
		.unwrap()
		.total_count
}

#[tokio::test]
async fn test_records_matching_transactions_of_new_blocks() {
	let (client, _) = recording_client();
	let h = &harness(client, vec![ConfigurationBuilder::new().min_value(1_000).build()]);

	h.monitor.initialize().await.unwrap();
	h.monitor.start().await.unwrap();
	assert_eq!(h.subscriber.start_after().await, Some(REFERENCE_HEIGHT));

	assert!(h.subscriber.emit(101).await);
	wait_until(move || async move { h.transactions.len().await == 2 }).await;
	wait_until(move || async move {
		h.monitor.status().await.last_processed_height == Some(101)
	})
	.await;

	let page = h
		.transactions
		.list(&TransactionQuery::for_configuration(1), Pagination::default())
		.await
		.unwrap();
	let mut values: Vec<String> = page.items.iter().map(|r| r.value.clone()).collect();
	values.sort();
	assert_eq!(values, vec!["1000".to_string(), "2000".to_string()]);
	assert!(page.items.iter().all(|r| r.block_number == 101));

	let status = h.monitor.status().await;
	assert_eq!(status.state, MonitorState::Monitoring);
	assert!(status.running);
	assert!(status.monitoring_enabled);

	h.monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_heights_at_or_below_last_processed_are_ignored() {
	let (client, fetched) = recording_client();
	let h = &harness(client, vec![ConfigurationBuilder::new().build()]);

	h.monitor.initialize().await.unwrap();
	h.monitor.start().await.unwrap();

	h.subscriber.emit(REFERENCE_HEIGHT).await;
	h.subscriber.emit(REFERENCE_HEIGHT - 1).await;
	h.subscriber.emit(102).await;
	h.subscriber.emit(101).await;
	h.subscriber.emit(102).await;
	h.subscriber.emit(103).await;
	wait_until(move || async move {
		h.monitor.status().await.last_processed_height == Some(103)
	})
	.await;

	assert_eq!(fetched_heights(&fetched), vec![102, 103]);
	h.monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_configuration_change_applies_to_next_block() {
	let (client, fetched) = recording_client();
	let h = &harness(client, Vec::new());

	h.monitor.initialize().await.unwrap();
	h.monitor.start().await.unwrap();
	assert!(h.monitor.snapshot().await.is_empty());

	// Nothing to evaluate, so the block is not even fetched
	h.subscriber.emit(101).await;
	wait_until(move || async move {
		h.monitor.status().await.last_processed_height == Some(101)
	})
	.await;
	assert!(fetched_heights(&fetched).is_empty());
	assert!(h.transactions.is_empty().await);

	let created = h
		.configurations
		.create(
			ConfigurationBuilder::new()
				.id(0)
				.name("Large transfers")
				.min_value(1_500)
				.build(),
		)
		.await
		.unwrap();
	assert_eq!(created.id, 1);
	wait_until(move || async move { h.monitor.snapshot().await.len() == 1 }).await;
	wait_until(move || async move {
		h.monitor.status().await.state == MonitorState::Monitoring
	})
	.await;

	h.subscriber.emit(102).await;
	wait_until(move || async move {
		h.monitor.status().await.last_processed_height == Some(102)
	})
	.await;
	assert_eq!(fetched_heights(&fetched), vec![102]);

	h.configurations
		.update(1, ConfigurationBuilder::new().name("Large transfers").active(false).build())
		.await
		.unwrap();
	wait_until(move || async move { h.monitor.snapshot().await.is_empty() }).await;

	h.monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_delayed_configuration_evaluates_confirmed_height() {
	let (client, fetched) = recording_client();
	let h = &harness(
		client,
		vec![ConfigurationBuilder::new()
			.min_value(1_000)
			.block_delay(10)
			.build()],
	);

	h.monitor.initialize().await.unwrap();
	h.monitor.start().await.unwrap();

	// 101 is only evaluated once 111 arrives
	h.subscriber.emit(101).await;
	wait_until(move || async move {
		h.monitor.status().await.last_processed_height == Some(101)
	})
	.await;
	assert!(h.transactions.is_empty().await);

	h.subscriber.emit(111).await;
	wait_until(move || async move { h.transactions.len().await == 2 }).await;

	let heights = fetched_heights(&fetched);
	assert!(heights.contains(&101));
	assert!(!heights.contains(&111));

	let page = h
		.transactions
		.list(&TransactionQuery::default(), Pagination::default())
		.await
		.unwrap();
	assert!(page.items.iter().all(|r| r.block_number == 101));

	h.monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_reevaluated_block_is_recorded_once() {
	let data_dir = TempDir::new().unwrap();
	let transactions = Arc::new(FileTransactionRepository::new(Some(data_dir.path())).unwrap());
	let (client, fetched) = recording_client();
	let h = &harness_with(
		client,
		vec![
			ConfigurationBuilder::new().id(1).name("Live").min_value(1_000).build(),
			ConfigurationBuilder::new()
				.id(2)
				.name("Confirmed")
				.min_value(1_000)
				.block_delay(10)
				.build(),
		],
		transactions,
	);

	h.monitor.initialize().await.unwrap();
	h.monitor.start().await.unwrap();

	h.subscriber.emit(101).await;
	h.subscriber.emit(111).await;
	let fetched = &fetched;
	wait_until(move || async move {
		fetched_heights(&fetched)
			.iter()
			.filter(|height| **height == 101)
			.count() == 2
	})
	.await;

	// Stopping waits for the delayed evaluation to finish
	h.monitor.stop().await.unwrap();

	assert_eq!(stored_count(h.transactions.as_ref()).await, 2);
	let by_delayed = h
		.transactions
		.list(&TransactionQuery::for_configuration(2), Pagination::default())
		.await
		.unwrap();
	assert_eq!(by_delayed.total_count, 0);
}

#[tokio::test]
async fn test_stop_is_idempotent_and_monitor_can_restart() {
	let (client, _) = recording_client();
	let h = &harness(client, vec![ConfigurationBuilder::new().build()]);

	h.monitor.initialize().await.unwrap();
	h.monitor.start().await.unwrap();
	h.monitor.start().await.unwrap();
	assert_eq!(h.subscriber.subscriptions(), 1);

	h.monitor.stop().await.unwrap();
	h.monitor.stop().await.unwrap();
	assert_eq!(h.subscriber.unsubscriptions(), 1);
	assert!(!h.subscriber.is_subscribed().await);
	let status = h.monitor.status().await;
	assert_eq!(status.state, MonitorState::Stopped);
	assert!(!status.running);

	h.monitor.start().await.unwrap();
	assert_eq!(h.subscriber.subscriptions(), 2);
	assert_eq!(h.monitor.status().await.state, MonitorState::Monitoring);

	h.subscriber.emit(101).await;
	wait_until(move || async move { h.transactions.len().await == 3 }).await;

	h.monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_dropping_running_monitor_cancels_subscription() {
	let (client, _) = recording_client();
	let Harness {
		monitor,
		subscriber,
		..
	} = harness(client, vec![ConfigurationBuilder::new().build()]);

	monitor.initialize().await.unwrap();
	monitor.start().await.unwrap();
	assert!(subscriber.is_subscribed().await);

	drop(monitor);

	let subscriber = &subscriber;
	wait_until(move || async move { subscriber.unsubscriptions() == 1 }).await;
	assert!(!subscriber.is_subscribed().await);
}

#[tokio::test]
async fn test_monitor_without_data_source_is_degraded() {
	let configurations = Arc::new(InMemoryConfigurationRepository::with_configurations(vec![
		ConfigurationBuilder::new().build(),
	]));
	let monitor = MonitorService::new(
		configurations,
		Arc::new(InMemoryTransactionRepository::new()),
		None,
		pipeline_config(),
	);

	monitor.initialize().await.unwrap();
	monitor.start().await.unwrap();

	let status = monitor.status().await;
	assert_eq!(status.state, MonitorState::Ready);
	assert!(!status.monitoring_enabled);
	assert!(!status.running);
	assert_eq!(status.active_configurations, 1);
	assert_eq!(status.last_processed_height, None);

	monitor.stop().await.unwrap();
	assert_eq!(monitor.status().await.state, MonitorState::Ready);
}

#[tokio::test]
async fn test_start_requires_initialize() {
	let (client, _) = recording_client();
	let h = &harness(client, Vec::new());

	let result = h.monitor.start().await;

	assert!(matches!(result, Err(MonitorError::StateError(_))));
	assert_eq!(h.subscriber.subscriptions(), 0);
	assert_eq!(h.monitor.status().await.state, MonitorState::Uninitialized);
}

#[tokio::test]
async fn test_start_fails_when_tip_is_unavailable() {
	let mut client = MockEvmClient::new();
	client
		.expect_get_latest_block_number()
		.returning(|| Err(BlockChainError::connection_error("node offline", None, None)));
	let h = &harness(client, Vec::new());

	h.monitor.initialize().await.unwrap();
	let result = h.monitor.start().await;

	assert!(matches!(result, Err(MonitorError::SubscriptionError(_))));
	assert_eq!(h.subscriber.subscriptions(), 0);
	assert_eq!(h.monitor.status().await.state, MonitorState::Ready);
}

#[tokio::test]
async fn test_start_fails_when_subscription_fails() {
	let mut client = MockEvmClient::new();
	client
		.expect_get_latest_block_number()
		.returning(|| Ok(REFERENCE_HEIGHT));
	let mut subscriber = MockBlockSubscriber::new();
	subscriber
		.expect_subscribe_new_blocks()
		.times(1)
		.returning(|_, _| Err(BlockWatcherError::scheduler_error("no scheduler", None, None)));
	subscriber.expect_unsubscribe_new_blocks().never();

	let monitor = MonitorService::new(
		Arc::new(InMemoryConfigurationRepository::new()),
		Arc::new(InMemoryTransactionRepository::new()),
		Some(DataSource {
			client: Arc::new(client),
			subscriber: Arc::new(subscriber),
		}),
		pipeline_config(),
	);

	monitor.initialize().await.unwrap();
	let result = monitor.start().await;

	assert!(matches!(result, Err(MonitorError::SubscriptionError(_))));
	let status = monitor.status().await;
	assert_eq!(status.state, MonitorState::Ready);
	assert!(!status.running);

	// Nothing to stop
	monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_block_fetch_failure_skips_height_only() {
	let mut client = MockEvmClient::new();
	client
		.expect_get_latest_block_number()
		.returning(|| Ok(REFERENCE_HEIGHT));
	client.expect_get_block().returning(|height, _| {
		if height == 101 {
			Err(BlockChainError::request_error("header not found", None, None))
		} else {
			Ok(Some(
				BlockBuilder::new()
					.number(height)
					.transactions(vec![transfer(9, 5_000)])
					.build(),
			))
		}
	});
	let h = &harness(client, vec![ConfigurationBuilder::new().build()]);

	h.monitor.initialize().await.unwrap();
	h.monitor.start().await.unwrap();

	h.subscriber.emit(101).await;
	h.subscriber.emit(102).await;
	wait_until(move || async move { h.transactions.len().await == 1 }).await;
	wait_until(move || async move {
		h.monitor.status().await.last_processed_height == Some(102)
	})
	.await;

	let stored = h
		.transactions
		.find_by_hash(&format!("0x{}", "09".repeat(32)))
		.await
		.unwrap()
		.unwrap();
	assert_eq!(stored.block_number, 102);

	h.monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_reload_configurations_installs_current_rules() {
	let (client, _) = recording_client();
	let h = &harness(client, vec![ConfigurationBuilder::new().id(3).build()]);

	h.monitor.initialize().await.unwrap();
	assert_eq!(h.monitor.snapshot().await.len(), 1);

	let listed = h.configurations.list_active().await.unwrap();
	assert_eq!(listed.len(), 1);
	assert_eq!(h.monitor.reload_configurations().await.unwrap(), 1);
	assert_eq!(h.monitor.snapshot().await.configurations()[0].id, 3);
}
