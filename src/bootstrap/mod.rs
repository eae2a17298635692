//! Bootstrap module for wiring the monitor together.
//!
//! Builds the repositories, the blockchain data source and the monitor from the
//! process settings. A data source that cannot be built is not fatal: the monitor
//! is then created without one and runs in degraded mode.

use std::{
	collections::{HashMap, HashSet},
	error::Error,
	fs,
	path::Path,
	sync::Arc,
};

use crate::{
	models::{ConfigError, ConfigLoader, Configuration, MonitorSettings, Network},
	repositories::{FileConfigurationRepository, FileTransactionRepository, TransactionService},
	services::{
		blockchain::{EVMTransportClient, EvmClient},
		blockwatcher::NewBlockWatcher,
		monitor::{DataSource, MonitorService, PipelineConfig},
	},
};

/// Type alias for handling ServiceResult
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// The monitor as wired by [`initialize_services`]
pub type MonitorServiceType = MonitorService<FileConfigurationRepository, FileTransactionRepository>;

type ServiceResult = Result<(
	Arc<MonitorServiceType>,
	Arc<FileConfigurationRepository>,
	TransactionService<FileTransactionRepository>,
)>;

/// Initializes all services needed by the monitor.
///
/// The configuration repository starts polling its directory right away. The
/// returned monitor is not initialized yet.
///
/// # Returns
/// Returns a tuple containing:
/// - MonitorService: The monitor itself
/// - FileConfigurationRepository: The configuration store it reads from
/// - TransactionService: Read access to the recorded transactions
///
/// # Errors
/// Returns an error if the transaction store cannot be opened or the configuration
/// poll job cannot be scheduled
pub async fn initialize_services(settings: &MonitorSettings) -> ServiceResult {
	let configuration_repository =
		Arc::new(FileConfigurationRepository::new(settings.config_dir.clone()));
	configuration_repository
		.start_watching(&settings.config_poll_schedule)
		.await?;

	let transaction_repository =
		Arc::new(FileTransactionRepository::new(Some(&settings.data_dir))?);
	let transaction_service =
		TransactionService::new_with_repository(transaction_repository.clone());

	let data_source = match &settings.network {
		Some(network) => create_data_source(network).await,
		None => {
			tracing::warn!(
				"No RPC_URL or INFURA_API_KEY configured, block monitoring is disabled"
			);
			None
		}
	};

	let monitor = Arc::new(MonitorService::new(
		configuration_repository.clone(),
		transaction_repository,
		data_source,
		PipelineConfig {
			request_delay: settings.request_delay,
			receipt_policy: settings.receipt_policy,
		},
	));

	Ok((monitor, configuration_repository, transaction_service))
}

/// Connects to the network and builds the block source for it
///
/// Returns `None`, after logging why, when no endpoint of the network answers.
pub async fn create_data_source(network: &Network) -> Option<DataSource> {
	match EvmClient::<EVMTransportClient>::new(network).await {
		Ok(client) => {
			let client = Arc::new(client);
			let watcher = NewBlockWatcher::<EvmClient<EVMTransportClient>>::new(
				network.clone(),
				client.clone(),
			);
			tracing::info!(network = %network.slug, "Connected to blockchain data source");
			Some(DataSource {
				client,
				subscriber: Arc::new(watcher),
			})
		}
		Err(e) => {
			tracing::warn!(
				network = %network.slug,
				error = %e,
				"Failed to connect to blockchain data source, block monitoring is disabled"
			);
			None
		}
	}
}

/// Validates every configuration file in `dir`
///
/// Unlike the repository, which skips broken files, this reports them. Duplicate
/// ids and names across files are reported as well.
///
/// # Returns
/// The number of valid configurations
pub fn check_configurations(dir: &Path) -> std::result::Result<usize, ConfigError> {
	if !dir.exists() {
		return Err(ConfigError::file_error(
			"configurations directory not found",
			None,
			Some(HashMap::from([(
				"path".to_string(),
				dir.display().to_string(),
			)])),
		));
	}

	let mut problems = Vec::new();
	let mut ids = HashSet::new();
	let mut names = HashSet::new();
	let mut valid = 0;

	let mut paths: Vec<_> = fs::read_dir(dir)?
		.filter_map(|entry| entry.ok().map(|e| e.path()))
		.filter(|path| Configuration::is_json_file(path))
		.collect();
	paths.sort();

	for path in paths {
		match Configuration::load_from_path(&path) {
			Ok(configuration) => {
				if !ids.insert(configuration.id) {
					problems.push(format!(
						"{}: duplicate id {}",
						path.display(),
						configuration.id
					));
				} else if !names.insert(configuration.name.to_lowercase()) {
					problems.push(format!(
						"{}: duplicate name '{}'",
						path.display(),
						configuration.name
					));
				} else {
					valid += 1;
				}
			}
			Err(e) => problems.push(format!("{}: {}", path.display(), e)),
		}
	}

	if problems.is_empty() {
		Ok(valid)
	} else {
		Err(ConfigError::validation_error(
			format!("Invalid configurations: {}", problems.join("; ")),
			None,
			Some(HashMap::from([(
				"path".to_string(),
				dir.display().to_string(),
			)])),
		))
	}
}
