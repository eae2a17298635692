use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mockall::mock;
use tokio::sync::{mpsc, Mutex};
use tokio_cron_scheduler::Job;

use crate::integration::mocks::MockEvmClient;
use ethereum_tx_monitor::{
	services::{
		blockchain::BlockChainError,
		blockwatcher::{
			heights_to_emit, process_new_blocks, BlockSubscriber, BlockWatcherError,
			JobSchedulerTrait, NewBlockWatcher,
		},
	},
	utils::tests::builders::network::NetworkBuilder,
};

mock! {
	pub JobScheduler {}

	#[async_trait]
	impl JobSchedulerTrait for JobScheduler {
		async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>>;
		async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
		async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
		async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	}
}

#[test]
fn test_heights_to_emit_edges() {
	assert!(heights_to_emit(100, 100, 10).is_empty());
	assert!(heights_to_emit(100, 99, 10).is_empty());
	assert_eq!(heights_to_emit(100, 101, 10), vec![101]);
	assert_eq!(heights_to_emit(0, 3, 10), vec![1, 2, 3]);
	assert_eq!(heights_to_emit(100, 150, 3), vec![148, 149, 150]);
	assert_eq!(heights_to_emit(100, 150, 1), vec![150]);
}

#[tokio::test]
async fn test_bounded_catch_up_after_falling_behind() {
	let network = NetworkBuilder::new().max_past_blocks(5).build();
	let mut client = MockEvmClient::new();
	client
		.expect_get_latest_block_number()
		.times(1)
		.returning(|| Ok(1_000));
	let last_seen = Mutex::new(10);
	let (sender, mut receiver) = mpsc::channel(16);

	let delivered = process_new_blocks(&network, &client, &last_seen, &sender)
		.await
		.unwrap();

	assert_eq!(delivered, 5);
	let mut heights = Vec::new();
	while let Ok(height) = receiver.try_recv() {
		heights.push(height);
	}
	assert_eq!(heights, vec![996, 997, 998, 999, 1_000]);
	assert_eq!(*last_seen.lock().await, 1_000);
}

#[tokio::test]
async fn test_tip_failure_leaves_last_seen_untouched() {
	let network = NetworkBuilder::new().build();
	let mut client = MockEvmClient::new();
	client.expect_get_latest_block_number().returning(|| {
		Err(BlockChainError::connection_error("node offline", None, None))
	});
	let last_seen = Mutex::new(42);
	let (sender, _receiver) = mpsc::channel(16);

	let result = process_new_blocks(&network, &client, &last_seen, &sender).await;

	assert!(matches!(result, Err(BlockWatcherError::NetworkError(_))));
	assert_eq!(*last_seen.lock().await, 42);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watcher_announces_heights_after_start() {
	let network = NetworkBuilder::new()
		.cron_schedule("*/1 * * * * *")
		.max_past_blocks(10)
		.build();
	let mut client = MockEvmClient::new();
	client
		.expect_get_latest_block_number()
		.returning(|| Ok(203));
	let watcher = NewBlockWatcher::<MockEvmClient>::new(network, Arc::new(client));
	let (sender, mut receiver) = mpsc::channel(16);

	watcher.subscribe_new_blocks(200, sender).await.unwrap();

	let mut heights = Vec::new();
	while heights.len() < 3 {
		let height = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
			.await
			.expect("watcher should announce heights")
			.expect("channel should stay open");
		heights.push(height);
	}
	assert_eq!(heights, vec![201, 202, 203]);

	watcher.unsubscribe_new_blocks().await.unwrap();
	assert!(!watcher.is_subscribed().await);
}

#[tokio::test]
async fn test_scheduler_lifecycle_and_errors() {
	let network = NetworkBuilder::new().build();

	// Scheduler fails to initialize
	{
		let ctx = MockJobScheduler::new_context();
		ctx.expect()
			.returning(|| Err("Failed to initialize scheduler".into()));

		let watcher = NewBlockWatcher::<MockEvmClient, MockJobScheduler>::new(
			network.clone(),
			Arc::new(MockEvmClient::new()),
		);
		let (sender, _receiver) = mpsc::channel(1);

		let result = watcher.subscribe_new_blocks(0, sender).await;
		assert!(matches!(result, Err(BlockWatcherError::SchedulerError(_))));
		assert!(!watcher.is_subscribed().await);
	}

	// Scheduler fails to add the job
	{
		let ctx = MockJobScheduler::new_context();
		ctx.expect().returning(|| {
			let mut scheduler = MockJobScheduler::default();
			scheduler
				.expect_add()
				.returning(|_| Err("Failed to add job".into()));
			Ok(scheduler)
		});

		let watcher = NewBlockWatcher::<MockEvmClient, MockJobScheduler>::new(
			network.clone(),
			Arc::new(MockEvmClient::new()),
		);
		let (sender, _receiver) = mpsc::channel(1);

		let result = watcher.subscribe_new_blocks(0, sender).await;
		assert!(matches!(result, Err(BlockWatcherError::SchedulerError(_))));
		assert!(!watcher.is_subscribed().await);
	}

	// Scheduler fails to start
	{
		let ctx = MockJobScheduler::new_context();
		ctx.expect().returning(|| {
			let mut scheduler = MockJobScheduler::default();
			scheduler.expect_add().returning(|_| Ok(()));
			scheduler
				.expect_start()
				.returning(|| Err("Failed to start scheduler".into()));
			Ok(scheduler)
		});

		let watcher = NewBlockWatcher::<MockEvmClient, MockJobScheduler>::new(
			network.clone(),
			Arc::new(MockEvmClient::new()),
		);
		let (sender, _receiver) = mpsc::channel(1);

		let result = watcher.subscribe_new_blocks(0, sender).await;
		assert!(matches!(result, Err(BlockWatcherError::SchedulerError(_))));
	}

	// Subscribe once, a second subscribe is a no-op, unsubscribe shuts down
	{
		let ctx = MockJobScheduler::new_context();
		ctx.expect().times(1).returning(|| {
			let mut scheduler = MockJobScheduler::default();
			scheduler.expect_add().times(1).returning(|_| Ok(()));
			scheduler.expect_start().times(1).returning(|| Ok(()));
			scheduler.expect_shutdown().times(1).returning(|| Ok(()));
			Ok(scheduler)
		});

		let watcher = NewBlockWatcher::<MockEvmClient, MockJobScheduler>::new(
			network.clone(),
			Arc::new(MockEvmClient::new()),
		);
		let (sender, _receiver) = mpsc::channel(1);

		watcher.subscribe_new_blocks(0, sender.clone()).await.unwrap();
		watcher.subscribe_new_blocks(0, sender).await.unwrap();
		assert!(watcher.is_subscribed().await);

		watcher.unsubscribe_new_blocks().await.unwrap();
		watcher.unsubscribe_new_blocks().await.unwrap();
		assert!(!watcher.is_subscribed().await);
	}
}
