//! Monitor service implementation.
//!
//! Owns the installed configuration snapshot and drives the block pipeline:
//! - live heights arrive through the block subscription and are queued for a single
//!   worker, so they are processed in order
//! - delayed heights derived from each live height run as separate tasks
//! - configuration change notifications install a freshly loaded snapshot
//!
//! Lifecycle: `Uninitialized -> Ready -> Monitoring <-> Reloading`, and
//! `Monitoring -> Stopped`. Without a blockchain data source the monitor stays in
//! `Ready` with monitoring disabled.

use std::{
	fmt,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc, Weak,
	},
};

use serde::Serialize;
use tokio::{
	sync::{broadcast, mpsc, watch, Mutex, RwLock},
	task::{JoinHandle, JoinSet},
};
use tracing::instrument;

use crate::{
	models::ProcessedBlock,
	repositories::{ConfigurationRepositoryTrait, TransactionRepositoryTrait},
	services::{
		blockchain::BlockChainClient,
		blockwatcher::BlockSubscriber,
		monitor::{
			error::MonitorError,
			pipeline::{BlockPipeline, PipelineConfig},
			recorder::MatchRecorder,
			scheduler::pending_work,
			snapshot::ConfigurationSnapshot,
		},
	},
	utils::constants::BLOCK_QUEUE_CAPACITY,
};

const NO_HEIGHT: u64 = u64::MAX;

/// Lifecycle state of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
	Uninitialized,
	Ready,
	Monitoring,
	Reloading,
	Stopped,
}

impl fmt::Display for MonitorState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Uninitialized => "uninitialized",
			Self::Ready => "ready",
			Self::Monitoring => "monitoring",
			Self::Reloading => "reloading",
			Self::Stopped => "stopped",
		};
		write!(f, "{}", name)
	}
}

/// Read-only view of the monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
	pub state: MonitorState,
	/// Whether new blocks are being processed
	pub running: bool,
	/// Whether a blockchain data source is available at all
	pub monitoring_enabled: bool,
	pub last_processed_height: Option<u64>,
	pub active_configurations: usize,
}

/// Blockchain access used by the monitor
#[derive(Clone)]
pub struct DataSource {
	pub client: Arc<dyn BlockChainClient>,
	pub subscriber: Arc<dyn BlockSubscriber>,
}

/// State shared between the service, its worker and its reload listener
struct Shared<R: ?Sized, T: ?Sized> {
	configuration_repository: Arc<R>,
	pipeline: Option<Arc<BlockPipeline<dyn BlockChainClient, T>>>,
	snapshot: RwLock<Arc<ConfigurationSnapshot>>,
	state: RwLock<MonitorState>,
	last_processed_height: AtomicU64,
}

impl<R, T> Shared<R, T>
where
	R: ConfigurationRepositoryTrait + ?Sized + 'static,
	T: TransactionRepositoryTrait + ?Sized + 'static,
{
	fn last_processed_height(&self) -> Option<u64> {
		match self.last_processed_height.load(Ordering::SeqCst) {
			NO_HEIGHT => None,
			height => Some(height),
		}
	}

	/// Loads a new snapshot and installs it, keeping the current one on failure
	async fn reload(&self) -> Result<usize, MonitorError> {
		let configurations = self
			.configuration_repository
			.list_active()
			.await
			.map_err(|e| {
				MonitorError::configuration_error(
					"Failed to load active configurations",
					Some(Box::new(e)),
					None,
				)
			})?;

		let snapshot = Arc::new(ConfigurationSnapshot::load(configurations));
		let count = snapshot.len();
		*self.snapshot.write().await = snapshot;

		tracing::info!(active_configurations = count, "Configuration snapshot installed");
		Ok(count)
	}

	/// Reload triggered by a change notification
	///
	/// While monitoring, the state moves to `Reloading` for the duration of the load.
	async fn reload_on_change(&self) {
		let was_monitoring = {
			let mut state = self.state.write().await;
			if *state == MonitorState::Monitoring {
				*state = MonitorState::Reloading;
				true
			} else {
				false
			}
		};

		if let Err(e) = self.reload().await {
			tracing::warn!(error = %e, "Configuration reload failed, keeping previous snapshot");
		}

		if was_monitoring {
			let mut state = self.state.write().await;
			if *state == MonitorState::Reloading {
				*state = MonitorState::Monitoring;
			}
		}
	}

	/// Handles one live height
	///
	/// Heights at or below the last processed height are ignored, which keeps the
	/// last processed height monotonic.
	#[instrument(skip_all, fields(block = height))]
	async fn handle_new_block(&self, height: u64, delayed: &mut JoinSet<()>) {
		if self
			.last_processed_height()
			.is_some_and(|last| height <= last)
		{
			tracing::debug!("Height already processed, ignoring");
			return;
		}
		let Some(pipeline) = self.pipeline.clone() else {
			return;
		};
		let snapshot = self.snapshot.read().await.clone();

		match pipeline.process_height(height, 0, snapshot.live()).await {
			Ok(summary) => log_summary(&summary),
			Err(e) => tracing::warn!(error = %e, "Live block skipped"),
		}
		self.last_processed_height.store(height, Ordering::SeqCst);

		for work in pending_work(height, snapshot.delay_index()) {
			let pipeline = pipeline.clone();
			delayed.spawn(async move {
				match pipeline
					.process_height(work.target_height, work.block_delay, &work.configurations)
					.await
				{
					Ok(summary) => log_summary(&summary),
					Err(e) => tracing::warn!(
						error = %e,
						height = work.target_height,
						delay = work.block_delay,
						"Delayed block skipped"
					),
				}
			});
		}
	}
}

fn log_summary(summary: &ProcessedBlock) {
	tracing::debug!(
		block = summary.block_number,
		delay = summary.block_delay,
		transactions = summary.transactions_seen,
		matched = summary.matched.len(),
		"Block evaluated"
	);
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
	if let Err(e) = result {
		tracing::error!(error = %e, "Delayed block task failed");
	}
}

/// Consumes live heights until shutdown is signalled or the queue closes
///
/// A run in progress is finished before shutdown is honoured, and in-flight
/// delayed tasks are awaited before the worker exits.
async fn run_worker<R, T>(
	shared: Arc<Shared<R, T>>,
	mut blocks: mpsc::Receiver<u64>,
	mut shutdown: watch::Receiver<bool>,
) where
	R: ConfigurationRepositoryTrait + ?Sized + 'static,
	T: TransactionRepositoryTrait + ?Sized + 'static,
{
	let mut delayed = JoinSet::new();

	loop {
		tokio::select! {
			biased;
			_ = shutdown.changed() => break,
			height = blocks.recv() => match height {
				Some(height) => shared.handle_new_block(height, &mut delayed).await,
				None => break,
			},
			Some(result) = delayed.join_next(), if !delayed.is_empty() => log_join_result(result),
		}
	}

	while let Some(result) = delayed.join_next().await {
		log_join_result(result);
	}
	tracing::debug!("Block worker stopped");
}

/// Reloads the snapshot on every configuration change notification
///
/// A lagged receiver missed notifications, which still means something changed.
async fn run_reload_listener<R, T>(
	shared: Weak<Shared<R, T>>,
	mut changes: broadcast::Receiver<crate::repositories::ConfigurationChange>,
) where
	R: ConfigurationRepositoryTrait + ?Sized + 'static,
	T: TransactionRepositoryTrait + ?Sized + 'static,
{
	loop {
		match changes.recv().await {
			Ok(change) => {
				tracing::debug!(kind = ?change.kind, configuration = ?change.configuration_id, "Configuration changed");
			}
			Err(broadcast::error::RecvError::Lagged(missed)) => {
				tracing::debug!(missed, "Configuration notifications lagged");
			}
			Err(broadcast::error::RecvError::Closed) => break,
		}
		let Some(shared) = shared.upgrade() else {
			break;
		};
		shared.reload_on_change().await;
	}
}

/// Running block worker
struct Worker {
	shutdown: watch::Sender<bool>,
	handle: JoinHandle<()>,
}

/// The monitor
///
/// # Type Parameters
/// * `R` - Configuration repository
/// * `T` - Transaction repository
pub struct MonitorService<R: ?Sized, T: ?Sized> {
	shared: Arc<Shared<R, T>>,
	data_source: Option<DataSource>,
	worker: Mutex<Option<Worker>>,
}

impl<R, T> MonitorService<R, T>
where
	R: ConfigurationRepositoryTrait + ?Sized + 'static,
	T: TransactionRepositoryTrait + ?Sized + 'static,
{
	/// Creates an uninitialized monitor
	///
	/// Passing no data source yields a monitor that loads configurations but never
	/// processes blocks.
	pub fn new(
		configuration_repository: Arc<R>,
		transaction_repository: Arc<T>,
		data_source: Option<DataSource>,
		pipeline_config: PipelineConfig,
	) -> Self {
		let pipeline = data_source.as_ref().map(|source| {
			Arc::new(BlockPipeline::new(
				source.client.clone(),
				MatchRecorder::new(transaction_repository),
				pipeline_config,
			))
		});

		Self {
			shared: Arc::new(Shared {
				configuration_repository,
				pipeline,
				snapshot: RwLock::new(Arc::new(ConfigurationSnapshot::default())),
				state: RwLock::new(MonitorState::Uninitialized),
				last_processed_height: AtomicU64::new(NO_HEIGHT),
			}),
			data_source,
			worker: Mutex::new(None),
		}
	}

	/// Loads the first snapshot and starts listening for configuration changes
	///
	/// A configuration store that cannot be read leaves an empty snapshot in place.
	/// Calling it again after the first time is a no-op.
	#[instrument(skip_all)]
	pub async fn initialize(&self) -> Result<(), MonitorError> {
		let mut state = self.shared.state.write().await;
		if *state != MonitorState::Uninitialized {
			return Ok(());
		}

		let changes = self.shared.configuration_repository.subscribe();
		if let Err(e) = self.shared.reload().await {
			tracing::warn!(error = %e, "Starting with no configurations");
		}
		tokio::spawn(run_reload_listener(Arc::downgrade(&self.shared), changes));

		if self.data_source.is_none() {
			tracing::warn!("Blockchain data source unavailable, monitoring disabled");
		}
		*state = MonitorState::Ready;
		Ok(())
	}

	/// Starts processing new blocks
	///
	/// The current tip becomes the reference height; only later heights are
	/// processed. Starting while monitoring, or with monitoring disabled, is a no-op.
	#[instrument(skip_all)]
	pub async fn start(&self) -> Result<(), MonitorError> {
		let mut worker = self.worker.lock().await;

		match *self.shared.state.read().await {
			MonitorState::Uninitialized => {
				return Err(MonitorError::state_error(
					"Monitor must be initialized before it is started",
					None,
					None,
				));
			}
			MonitorState::Monitoring | MonitorState::Reloading => return Ok(()),
			MonitorState::Ready | MonitorState::Stopped => {}
		}

		let Some(data_source) = &self.data_source else {
			tracing::info!("Monitoring disabled, nothing to start");
			return Ok(());
		};

		let tip = data_source
			.client
			.get_latest_block_number()
			.await
			.map_err(|e| {
				MonitorError::subscription_error(
					"Failed to read the chain tip",
					Some(Box::new(e)),
					None,
				)
			})?;
		self.shared.last_processed_height.store(tip, Ordering::SeqCst);

		let (block_sender, block_receiver) = mpsc::channel(BLOCK_QUEUE_CAPACITY);
		let (shutdown, shutdown_receiver) = watch::channel(false);
		let handle = tokio::spawn(run_worker(
			self.shared.clone(),
			block_receiver,
			shutdown_receiver,
		));

		if let Err(e) = data_source
			.subscriber
			.subscribe_new_blocks(tip, block_sender)
			.await
		{
			let _ = shutdown.send(true);
			let _ = handle.await;
			return Err(MonitorError::subscription_error(
				"Failed to subscribe to new blocks",
				Some(Box::new(e)),
				None,
			));
		}

		*worker = Some(Worker { shutdown, handle });
		*self.shared.state.write().await = MonitorState::Monitoring;
		tracing::info!(reference_height = tip, "Monitoring started");
		Ok(())
	}

	/// Stops processing new blocks and waits for in-flight work
	///
	/// Stopping a monitor that is not monitoring is a no-op. Call this before dropping a
	/// running monitor; `Drop` only signals shutdown and cannot wait for it.
	#[instrument(skip_all)]
	pub async fn stop(&self) -> Result<(), MonitorError> {
		let mut worker = self.worker.lock().await;
		let Some(Worker { shutdown, handle }) = worker.take() else {
			return Ok(());
		};

		if let Some(data_source) = &self.data_source {
			if let Err(e) = data_source.subscriber.unsubscribe_new_blocks().await {
				tracing::warn!(error = %e, "Failed to unsubscribe from new blocks");
			}
		}

		let _ = shutdown.send(true);
		if let Err(e) = handle.await {
			tracing::error!(error = %e, "Block worker failed");
		}

		*self.shared.state.write().await = MonitorState::Stopped;
		tracing::info!(
			last_processed_height = ?self.shared.last_processed_height(),
			"Monitoring stopped"
		);
		Ok(())
	}

	/// Reloads the snapshot now, keeping the current one on failure
	pub async fn reload_configurations(&self) -> Result<usize, MonitorError> {
		self.shared.reload().await
	}

	/// The installed snapshot
	pub async fn snapshot(&self) -> Arc<ConfigurationSnapshot> {
		self.shared.snapshot.read().await.clone()
	}

	pub async fn status(&self) -> MonitorStatus {
		let state = *self.shared.state.read().await;
		MonitorStatus {
			state,
			running: matches!(state, MonitorState::Monitoring | MonitorState::Reloading),
			monitoring_enabled: self.data_source.is_some(),
			last_processed_height: self.shared.last_processed_height(),
			active_configurations: self.shared.snapshot.read().await.len(),
		}
	}
}

/// Dropping a monitor that is still monitoring signals its worker and cancels the
/// block subscription in the background. Prefer [`MonitorService::stop`], which waits for
/// both.
impl<R: ?Sized, T: ?Sized> Drop for MonitorService<R, T> {
	fn drop(&mut self) {
		let Some(worker) = self.worker.get_mut().take() else {
			return;
		};
		let _ = worker.shutdown.send(true);

		let Some(data_source) = &self.data_source else {
			return;
		};
		match tokio::runtime::Handle::try_current() {
			Ok(runtime) => {
				let subscriber = data_source.subscriber.clone();
				runtime.spawn(async move {
					if let Err(e) = subscriber.unsubscribe_new_blocks().await {
						tracing::warn!(error = %e, "Failed to unsubscribe from new blocks");
					}
				});
			}
			Err(_) => {
				tracing::warn!("Monitor dropped outside a runtime, block subscription left open");
			}
		}
	}
}
