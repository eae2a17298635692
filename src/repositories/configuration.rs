//! Filter configuration repository implementations.
//!
//! Two stores are provided:
//! - [`FileConfigurationRepository`] reads one JSON file per configuration from a
//!   directory, keeps the last good load as a fallback and polls the directory for
//!   changes on a cron schedule.
//! - [`InMemoryConfigurationRepository`] supports create/update/delete with the same
//!   validation, for embedders and tests.
//!
//! Both publish [`ConfigurationChange`] notifications on a broadcast channel.

use std::{
	collections::{BTreeMap, HashMap},
	path::{Path, PathBuf},
	sync::Arc,
};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{
	models::{ConfigLoader, Configuration},
	repositories::error::RepositoryError,
	utils::constants::CONFIGURATION_CHANNEL_CAPACITY,
};

/// Kind of change made to the configuration store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigurationChangeKind {
	Created,
	Updated,
	Deleted,
	/// The whole store was re-read; individual changes are unknown
	Reloaded,
}

/// Notification published whenever the configuration store changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationChange {
	pub kind: ConfigurationChangeKind,
	/// Affected configuration, `None` for [`ConfigurationChangeKind::Reloaded`]
	pub configuration_id: Option<u64>,
}

impl ConfigurationChange {
	pub fn new(kind: ConfigurationChangeKind, configuration_id: Option<u64>) -> Self {
		Self {
			kind,
			configuration_id,
		}
	}

	pub fn reloaded() -> Self {
		Self::new(ConfigurationChangeKind::Reloaded, None)
	}
}

/// Interface for configuration repository implementations
///
/// This trait defines the operations the monitor needs from a configuration store,
/// allowing for different storage backends while maintaining a consistent interface.
#[async_trait]
pub trait ConfigurationRepositoryTrait: Send + Sync {
	/// Returns the active configurations ordered by ascending id
	async fn list_active(&self) -> Result<Vec<Configuration>, RepositoryError>;

	/// Subscribes to change notifications
	fn subscribe(&self) -> broadcast::Receiver<ConfigurationChange>;
}

/// Keeps active configurations ordered by id and drops id collisions
fn active_sorted(configurations: impl IntoIterator<Item = Configuration>) -> Vec<Configuration> {
	let mut by_id: BTreeMap<u64, Configuration> = BTreeMap::new();
	for configuration in configurations.into_iter().filter(|c| c.active) {
		if let Some(existing) = by_id.get(&configuration.id) {
			tracing::warn!(
				id = configuration.id,
				kept = %existing.name,
				ignored = %configuration.name,
				"Duplicate configuration id"
			);
			continue;
		}
		by_id.insert(configuration.id, configuration);
	}
	by_id.into_values().collect()
}

/// Hash over the names and contents of every JSON file in a directory
///
/// Returns `None` when the directory cannot be listed.
pub fn directory_fingerprint(dir: &Path) -> Option<String> {
	let pattern = dir.join("*.json");
	let mut paths: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
		.ok()?
		.filter_map(Result::ok)
		.collect();
	paths.sort();

	let mut hasher = Sha256::new();
	for path in paths {
		hasher.update(path.to_string_lossy().as_bytes());
		match std::fs::read(&path) {
			Ok(contents) => hasher.update(&contents),
			Err(e) => {
				tracing::debug!(path = %path.display(), error = %e, "Unreadable configuration file");
			}
		}
	}
	Some(hex::encode(hasher.finalize()))
}

/// File-backed configuration repository
#[derive(Clone)]
pub struct FileConfigurationRepository {
	path: PathBuf,
	cache: Arc<RwLock<Vec<Configuration>>>,
	sender: broadcast::Sender<ConfigurationChange>,
	scheduler: Arc<Mutex<Option<JobScheduler>>>,
}

impl FileConfigurationRepository {
	/// Create a new repository over the given directory
	///
	/// Nothing is read until the first [`list_active`](ConfigurationRepositoryTrait::list_active).
	pub fn new(path: impl Into<PathBuf>) -> Self {
		let (sender, _) = broadcast::channel(CONFIGURATION_CHANNEL_CAPACITY);
		Self {
			path: path.into(),
			cache: Arc::new(RwLock::new(Vec::new())),
			sender,
			scheduler: Arc::new(Mutex::new(None)),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load(&self) -> Result<Vec<Configuration>, RepositoryError> {
		// Keyed by file stem, so id collisions resolve in file name order
		let configurations: BTreeMap<String, Configuration> =
			Configuration::load_all(Some(&self.path)).map_err(|e| {
				RepositoryError::load_error(
					"Failed to load configurations",
					Some(Box::new(e)),
					Some(HashMap::from([(
						"path".to_string(),
						self.path.display().to_string(),
					)])),
				)
			})?;
		Ok(active_sorted(configurations.into_values()))
	}

	/// Starts polling the directory for changes
	///
	/// A [`ConfigurationChangeKind::Reloaded`] notification is published whenever the
	/// fingerprint of the directory differs from the previous poll. Calling this
	/// while already watching is a no-op.
	pub async fn start_watching(&self, schedule: &str) -> Result<(), RepositoryError> {
		let mut guard = self.scheduler.lock().await;
		if guard.is_some() {
			return Ok(());
		}

		let path = self.path.clone();
		let sender = self.sender.clone();
		let last_fingerprint = Arc::new(Mutex::new(directory_fingerprint(&path)));

		let job = Job::new_async(schedule, move |_uuid, _l| {
			let path = path.clone();
			let sender = sender.clone();
			let last_fingerprint = last_fingerprint.clone();
			Box::pin(async move {
				let fingerprint = directory_fingerprint(&path);
				let mut last = last_fingerprint.lock().await;
				if *last != fingerprint {
					*last = fingerprint;
					tracing::info!(path = %path.display(), "Configuration directory changed");
					let _ = sender.send(ConfigurationChange::reloaded());
				}
			})
		})
		.with_context(|| format!("Failed to create configuration poll job for '{}'", schedule))?;

		let scheduler = JobScheduler::new()
			.await
			.with_context(|| "Failed to create configuration poll scheduler")?;
		scheduler
			.add(job)
			.await
			.with_context(|| "Failed to add configuration poll job")?;
		scheduler
			.start()
			.await
			.with_context(|| "Failed to start configuration poll scheduler")?;

		tracing::info!(path = %self.path.display(), schedule, "Watching configuration directory");
		*guard = Some(scheduler);
		Ok(())
	}

	/// Stops polling the directory; a no-op when not watching
	pub async fn stop_watching(&self) -> Result<(), RepositoryError> {
		if let Some(mut scheduler) = self.scheduler.lock().await.take() {
			scheduler
				.shutdown()
				.await
				.with_context(|| "Failed to stop configuration poll scheduler")?;
		}
		Ok(())
	}
}

#[async_trait]
impl ConfigurationRepositoryTrait for FileConfigurationRepository {
	/// Reads the directory, falling back to the last good load when that fails
	async fn list_active(&self) -> Result<Vec<Configuration>, RepositoryError> {
		match self.load() {
			Ok(configurations) => {
				*self.cache.write().await = configurations.clone();
				Ok(configurations)
			}
			Err(e) => {
				let cache = self.cache.read().await;
				if cache.is_empty() {
					return Err(e);
				}
				tracing::warn!(
					error = %e,
					cached = cache.len(),
					"Using cached configurations"
				);
				Ok(cache.clone())
			}
		}
	}

	fn subscribe(&self) -> broadcast::Receiver<ConfigurationChange> {
		self.sender.subscribe()
	}
}

/// In-memory configuration repository with write operations
#[derive(Clone)]
pub struct InMemoryConfigurationRepository {
	configurations: Arc<RwLock<BTreeMap<u64, Configuration>>>,
	sender: broadcast::Sender<ConfigurationChange>,
}

impl Default for InMemoryConfigurationRepository {
	fn default() -> Self {
		let (sender, _) = broadcast::channel(CONFIGURATION_CHANNEL_CAPACITY);
		Self {
			configurations: Arc::new(RwLock::new(BTreeMap::new())),
			sender,
		}
	}
}

impl InMemoryConfigurationRepository {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a repository pre-populated with the given configurations
	///
	/// Entries are stored as given, without validation or notifications.
	pub fn with_configurations(configurations: impl IntoIterator<Item = Configuration>) -> Self {
		let map = configurations.into_iter().map(|c| (c.id, c)).collect();
		Self {
			configurations: Arc::new(RwLock::new(map)),
			..Self::default()
		}
	}

	fn check(
		configurations: &BTreeMap<u64, Configuration>,
		configuration: &Configuration,
	) -> Result<(), RepositoryError> {
		configuration.validate().map_err(|e| {
			RepositoryError::validation_error(
				"Invalid configuration",
				Some(Box::new(e)),
				Some(HashMap::from([(
					"name".to_string(),
					configuration.name.clone(),
				)])),
			)
		})?;

		let name_taken = configurations.values().any(|existing| {
			existing.id != configuration.id
				&& existing.name.eq_ignore_ascii_case(configuration.name.trim())
		});
		if name_taken {
			return Err(RepositoryError::validation_error(
				format!("Configuration name '{}' is already in use", configuration.name),
				None,
				None,
			));
		}
		Ok(())
	}

	fn notify(&self, kind: ConfigurationChangeKind, id: u64) {
		// No receivers is not an error
		let _ = self.sender.send(ConfigurationChange::new(kind, Some(id)));
	}

	/// Returns a configuration by id, active or not
	pub async fn get(&self, id: u64) -> Option<Configuration> {
		self.configurations.read().await.get(&id).cloned()
	}

	/// Stores a new configuration
	///
	/// An id of 0 is replaced by the next free id.
	pub async fn create(
		&self,
		mut configuration: Configuration,
	) -> Result<Configuration, RepositoryError> {
		let mut configurations = self.configurations.write().await;

		if configuration.id == 0 {
			configuration.id = configurations.keys().next_back().map_or(1, |id| id + 1);
		} else if configurations.contains_key(&configuration.id) {
			return Err(RepositoryError::validation_error(
				format!("Configuration id {} is already in use", configuration.id),
				None,
				None,
			));
		}

		Self::check(&configurations, &configuration)?;
		configurations.insert(configuration.id, configuration.clone());
		drop(configurations);

		self.notify(ConfigurationChangeKind::Created, configuration.id);
		Ok(configuration)
	}

	/// Replaces an existing configuration
	pub async fn update(
		&self,
		id: u64,
		mut configuration: Configuration,
	) -> Result<Configuration, RepositoryError> {
		let mut configurations = self.configurations.write().await;

		if !configurations.contains_key(&id) {
			return Err(RepositoryError::not_found(
				format!("Configuration {} does not exist", id),
				None,
			));
		}

		configuration.id = id;
		Self::check(&configurations, &configuration)?;
		configurations.insert(id, configuration.clone());
		drop(configurations);

		self.notify(ConfigurationChangeKind::Updated, id);
		Ok(configuration)
	}

	/// Removes a configuration
	pub async fn delete(&self, id: u64) -> Result<Configuration, RepositoryError> {
		let removed = self.configurations.write().await.remove(&id);
		match removed {
			Some(configuration) => {
				self.notify(ConfigurationChangeKind::Deleted, id);
				Ok(configuration)
			}
			None => Err(RepositoryError::not_found(
				format!("Configuration {} does not exist", id),
				None,
			)),
		}
	}
}

#[async_trait]
impl ConfigurationRepositoryTrait for InMemoryConfigurationRepository {
	async fn list_active(&self) -> Result<Vec<Configuration>, RepositoryError> {
		let configurations = self.configurations.read().await;
		Ok(active_sorted(configurations.values().cloned()))
	}

	fn subscribe(&self) -> broadcast::Receiver<ConfigurationChange> {
		self.sender.subscribe()
	}
}
