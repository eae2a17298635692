//! Block watcher service implementation.
//!
//! Polls the chain tip on the network's cron schedule and hands every new height to
//! the subscriber through a channel. The polling job only reads the tip and sends
//! heights, so it always returns promptly.

use anyhow::Context;
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::instrument;

use crate::{
	models::Network,
	services::{blockchain::BlockChainClient, blockwatcher::error::BlockWatcherError},
};

/// Trait for job scheduler
///
/// This trait is used to abstract the job scheduler implementation.
/// It is used to allow the block watcher to be used with different job scheduler
/// implementations.
#[async_trait]
pub trait JobSchedulerTrait: Send + Sync + Sized {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>>;
	async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Implementation of the job scheduler trait for the JobScheduler struct
#[async_trait]
impl JobSchedulerTrait for JobScheduler {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
		Self::new().await.map_err(Into::into)
	}

	async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.add(job).await.map(|_| ()).map_err(Into::into)
	}

	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.start().await.map(|_| ()).map_err(Into::into)
	}

	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.shutdown().await.map(|_| ()).map_err(Into::into)
	}
}

/// Source of new block notifications
///
/// Heights strictly greater than `start_after` are sent to `sender` in ascending
/// order as the chain advances.
#[async_trait]
pub trait BlockSubscriber: Send + Sync {
	async fn subscribe_new_blocks(
		&self,
		start_after: u64,
		sender: mpsc::Sender<u64>,
	) -> Result<(), BlockWatcherError>;

	/// Stops notifications. Calling it without an active subscription is a no-op.
	async fn unsubscribe_new_blocks(&self) -> Result<(), BlockWatcherError>;
}

/// Computes the heights to announce after `last_seen` given the current `tip`
///
/// When the watcher fell behind, only the newest `max_past_blocks` heights are
/// returned.
pub fn heights_to_emit(last_seen: u64, tip: u64, max_past_blocks: u64) -> Vec<u64> {
	if tip <= last_seen {
		return Vec::new();
	}
	let start = std::cmp::max(
		last_seen + 1,
		tip.saturating_sub(max_past_blocks.saturating_sub(1)),
	);
	(start..=tip).collect()
}

/// Polls the tip once and sends every new height to `sender`
///
/// `last_seen` only advances past heights that were actually delivered, so a full
/// queue defers the remaining heights to the next poll instead of blocking the job.
///
/// # Returns
/// The number of heights delivered
pub async fn process_new_blocks<C: BlockChainClient + ?Sized>(
	network: &Network,
	rpc_client: &C,
	last_seen: &Mutex<u64>,
	sender: &mpsc::Sender<u64>,
) -> Result<usize, BlockWatcherError> {
	let mut last_seen = last_seen.lock().await;

	let tip = rpc_client.get_latest_block_number().await.map_err(|e| {
		BlockWatcherError::network_error(
			"Failed to get latest block number",
			Some(e.into()),
			Some(HashMap::from([(
				"network".to_string(),
				network.slug.clone(),
			)])),
		)
	})?;

	let heights = heights_to_emit(*last_seen, tip, network.max_past_blocks);
	if heights.is_empty() {
		tracing::debug!(network = %network.slug, tip, "No new blocks");
		return Ok(0);
	}

	let mut delivered = 0;
	for height in heights {
		match sender.try_send(height) {
			Ok(()) => {
				*last_seen = height;
				delivered += 1;
			}
			Err(mpsc::error::TrySendError::Full(_)) => {
				tracing::warn!(
					network = %network.slug,
					height,
					"Block queue is full, deferring remaining heights"
				);
				break;
			}
			Err(mpsc::error::TrySendError::Closed(_)) => {
				return Err(BlockWatcherError::processing_error(
					"Block receiver was dropped",
					None,
					Some(HashMap::from([
						("network".to_string(), network.slug.clone()),
						("height".to_string(), height.to_string()),
					])),
				));
			}
		}
	}

	tracing::debug!(network = %network.slug, tip, delivered, "Announced new blocks");
	Ok(delivered)
}

/// Watches the chain tip of a single network
///
/// # Type Parameters
/// * `C` - Blockchain client used to read the tip
/// * `J` - Job scheduler implementation (must implement JobSchedulerTrait)
pub struct NewBlockWatcher<C: ?Sized, J: JobSchedulerTrait = JobScheduler> {
	network: Network,
	rpc_client: Arc<C>,
	scheduler: Mutex<Option<J>>,
}

impl<C, J> NewBlockWatcher<C, J>
where
	C: BlockChainClient + ?Sized + 'static,
	J: JobSchedulerTrait + 'static,
{
	/// Creates a watcher that is not yet polling
	pub fn new(network: Network, rpc_client: Arc<C>) -> Self {
		Self {
			network,
			rpc_client,
			scheduler: Mutex::new(None),
		}
	}

	pub fn network(&self) -> &Network {
		&self.network
	}

	/// Whether a polling job is currently scheduled
	pub async fn is_subscribed(&self) -> bool {
		self.scheduler.lock().await.is_some()
	}

	fn scheduler_error(
		&self,
		e: Box<dyn std::error::Error + Send + Sync>,
	) -> BlockWatcherError {
		BlockWatcherError::scheduler_error(
			e.to_string(),
			Some(e),
			Some(HashMap::from([(
				"network".to_string(),
				self.network.slug.clone(),
			)])),
		)
	}
}

#[async_trait]
impl<C, J> BlockSubscriber for NewBlockWatcher<C, J>
where
	C: BlockChainClient + ?Sized + 'static,
	J: JobSchedulerTrait + 'static,
{
	#[instrument(skip_all, fields(network = %self.network.slug))]
	async fn subscribe_new_blocks(
		&self,
		start_after: u64,
		sender: mpsc::Sender<u64>,
	) -> Result<(), BlockWatcherError> {
		let mut guard = self.scheduler.lock().await;
		if guard.is_some() {
			tracing::debug!("Already subscribed to new blocks");
			return Ok(());
		}

		let scheduler = J::new().await.map_err(|e| self.scheduler_error(e))?;

		let network = self.network.clone();
		let rpc_client = self.rpc_client.clone();
		let last_seen = Arc::new(Mutex::new(start_after));

		let job = Job::new_async(self.network.cron_schedule.as_str(), move |_uuid, _l| {
			let network = network.clone();
			let rpc_client = rpc_client.clone();
			let last_seen = last_seen.clone();
			let sender = sender.clone();
			Box::pin(async move {
				if let Err(e) =
					process_new_blocks(&network, rpc_client.as_ref(), &last_seen, &sender).await
				{
					tracing::warn!(network = %network.slug, error = %e, "Failed to poll new blocks");
				}
			})
		})
		.with_context(|| "Failed to create job")?;

		scheduler.add(job).await.map_err(|e| self.scheduler_error(e))?;
		scheduler.start().await.map_err(|e| self.scheduler_error(e))?;
		*guard = Some(scheduler);

		tracing::info!(start_after, "Subscribed to new blocks");
		Ok(())
	}

	#[instrument(skip_all, fields(network = %self.network.slug))]
	async fn unsubscribe_new_blocks(&self) -> Result<(), BlockWatcherError> {
		let Some(mut scheduler) = self.scheduler.lock().await.take() else {
			return Ok(());
		};
		scheduler
			.shutdown()
			.await
			.map_err(|e| self.scheduler_error(e))?;

		tracing::info!("Unsubscribed from new blocks");
		Ok(())
	}
}
