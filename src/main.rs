//! Ethereum transaction monitor entry point.
//!
//! Loads filter configurations and chain settings, starts the monitor and runs until
//! interrupted. Two one-shot modes are available as well:
//! - `--check` validates the configuration directory and exits
//! - `--list-matches <ID>` prints the transactions recorded for a configuration
//!
//! # Flow
//! 1. Loads `.env` and applies command line overrides to the environment
//! 2. Reads settings and wires the repositories, data source and monitor
//! 3. Loads the first configuration snapshot and starts watching new blocks
//! 4. Stops the monitor and the configuration poller on Ctrl+C

use clap::{Arg, ArgMatches, Command};
use dotenvy::dotenv;
use std::env::{set_var, var};
use tracing::{error, info};

use ethereum_tx_monitor::{
	bootstrap::{check_configurations, initialize_services, Result},
	models::{MonitorSettings, Pagination},
	repositories::TransactionService,
	utils::{constants::DEFAULT_PAGE_SIZE, logging::setup_logging},
};

fn build_cli() -> Command {
	Command::new("ethereum-tx-monitor")
		.version(env!("CARGO_PKG_VERSION"))
		.about(
			"Watches Ethereum blocks and records the transactions that match configurable \
			 address, value and gas filters.",
		)
		.arg(
			Arg::new("log-file")
				.long("log-file")
				.help("Write logs to file instead of stdout")
				.action(clap::ArgAction::SetTrue),
		)
		.arg(
			Arg::new("log-level")
				.long("log-level")
				.help("Set log level (trace, debug, info, warn, error)")
				.value_name("LEVEL"),
		)
		.arg(
			Arg::new("log-path")
				.long("log-path")
				.help("Path to store log files (default: logs/)")
				.value_name("PATH"),
		)
		.arg(
			Arg::new("config-dir")
				.long("config-dir")
				.help("Directory holding filter configurations (default: config/configurations)")
				.value_name("PATH"),
		)
		.arg(
			Arg::new("data-dir")
				.long("data-dir")
				.help("Directory holding recorded transactions (default: data/transactions)")
				.value_name("PATH"),
		)
		.arg(
			Arg::new("rpc-url")
				.long("rpc-url")
				.help("JSON-RPC endpoint(s), comma separated in priority order")
				.value_name("URL"),
		)
		.arg(
			Arg::new("check")
				.long("check")
				.help("Validate the configuration directory and exit")
				.action(clap::ArgAction::SetTrue),
		)
		.arg(
			Arg::new("list-matches")
				.long("list-matches")
				.help("Print the transactions recorded for a configuration and exit")
				.value_name("CONFIGURATION_ID")
				.value_parser(clap::value_parser!(u64))
				.conflicts_with("check"),
		)
		.arg(
			Arg::new("page")
				.long("page")
				.help("Page to print with --list-matches (default: 1)")
				.value_name("PAGE")
				.value_parser(clap::value_parser!(u64))
				.requires("list-matches"),
		)
		.arg(
			Arg::new("limit")
				.long("limit")
				.help("Page size for --list-matches (default: 20)")
				.value_name("LIMIT")
				.value_parser(clap::value_parser!(u64))
				.requires("list-matches"),
		)
}

/// Environment variables set from command line options
///
/// `LOG_MODE` is only produced when `--log-file` was given.
fn cli_overrides(matches: &ArgMatches) -> Vec<(&'static str, String)> {
	let mut overrides = Vec::new();

	if matches.get_flag("log-file") {
		overrides.push(("LOG_MODE", "file".to_string()));
	}

	for (arg, variable) in [
		("log-level", "LOG_LEVEL"),
		("log-path", "LOG_DATA_DIR"),
		("config-dir", "CONFIG_DIR"),
		("data-dir", "DATA_DIR"),
		("rpc-url", "RPC_URL"),
	] {
		if let Some(value) = matches.get_one::<String>(arg) {
			overrides.push((variable, value.clone()));
		}
	}

	overrides
}

/// Applies command line options to the environment
///
/// Only variables that are not already set are written.
fn apply_to_env(matches: &ArgMatches) {
	for (variable, value) in cli_overrides(matches) {
		if var(variable).is_err() {
			set_var(variable, value);
		}
	}
}

/// Prints one page of recorded transactions for `configuration_id` as JSON
async fn list_matches(
	settings: &MonitorSettings,
	configuration_id: u64,
	pagination: Pagination,
) -> Result<()> {
	let service = TransactionService::new_with_path(Some(&settings.data_dir))?;
	let page = service
		.get_transactions_by_configuration_id(configuration_id, pagination)
		.await?;

	info!(
		configuration = configuration_id,
		total = page.total_count,
		"Recorded transactions"
	);
	println!("{}", serde_json::to_string_pretty(&page)?);
	Ok(())
}

/// Main entry point for the transaction monitor.
///
/// # Errors
/// Returns an error if settings are invalid, if services cannot be initialized or if
/// the monitor fails to start.
#[tokio::main]
async fn main() -> Result<()> {
	let matches = build_cli().get_matches();

	// Load environment variables from .env file
	dotenv().ok();
	apply_to_env(&matches);

	setup_logging().unwrap_or_else(|e| {
		error!("Failed to setup logging: {}", e);
	});

	let settings = MonitorSettings::from_env()?;

	if matches.get_flag("check") {
		let count = check_configurations(&settings.config_dir)?;
		info!(
			path = %settings.config_dir.display(),
			count,
			"Configurations are valid"
		);
		return Ok(());
	}

	if let Some(configuration_id) = matches.get_one::<u64>("list-matches") {
		let pagination = Pagination::new(
			matches.get_one::<u64>("page").copied().unwrap_or(1),
			matches
				.get_one::<u64>("limit")
				.copied()
				.unwrap_or(DEFAULT_PAGE_SIZE),
		);
		return list_matches(&settings, *configuration_id, pagination).await;
	}

	let (monitor, configuration_repository, _) = initialize_services(&settings)
		.await
		.map_err(|e| anyhow::anyhow!("Failed to initialize services: {}", e))?;

	monitor.initialize().await?;
	monitor.start().await?;

	let status = monitor.status().await;
	info!(
		state = %status.state,
		monitoring = status.monitoring_enabled,
		configurations = status.active_configurations,
		data_dir = %settings.data_dir.display(),
		"Service started. Press Ctrl+C to shutdown"
	);

	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Error waiting for Ctrl+C: {}", e);
	}
	info!("Shutdown signal received, stopping services...");

	if let Err(e) = monitor.stop().await {
		error!("Error stopping monitor: {}", e);
	}
	if let Err(e) = configuration_repository.stop_watching().await {
		error!("Error stopping configuration watcher: {}", e);
	}

	info!("Shutdown complete");
	Ok(())
}
