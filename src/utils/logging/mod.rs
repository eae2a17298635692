//! ## Sets up logging by reading configuration from environment variables.
//!
//! Environment variables used:
//! - LOG_MODE: "stdout" (default) or "file"
//! - LOG_LEVEL: log level ("trace", "debug", "info", "warn", "error"); default is "info".
//!   `RUST_LOG` takes precedence when it holds a valid filter directive.
//! - LOG_DATA_DIR: directory for log files; default is "logs/"

pub mod error;

use std::{env, fs::create_dir_all, path::Path};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

type LoggingResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Creates a log format with configurable ANSI support
fn create_log_format(with_ansi: bool) -> fmt::format::Format<fmt::format::Compact> {
	fmt::format()
		.with_level(true)
		.with_target(true)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_ansi(with_ansi)
		.compact()
}

/// Builds the level filter from `RUST_LOG`, falling back to `LOG_LEVEL` and then "info"
fn build_env_filter() -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		let level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
		EnvFilter::try_new(level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
	})
}

/// Sets up logging by reading configuration from environment variables.
pub fn setup_logging() -> LoggingResult {
	let log_mode = env::var("LOG_MODE").unwrap_or_else(|_| "stdout".to_string());

	if log_mode.eq_ignore_ascii_case("file") {
		let log_dir = env::var("LOG_DATA_DIR").unwrap_or_else(|_| "logs/".to_string());
		let log_dir = Path::new(log_dir.trim_end_matches('/')).to_path_buf();
		create_dir_all(&log_dir)?;

		let file_appender = tracing_appender::rolling::daily(&log_dir, "monitor.log");

		tracing_subscriber::registry()
			.with(build_env_filter())
			.with(
				fmt::layer()
					.event_format(create_log_format(false))
					.with_writer(file_appender)
					.fmt_fields(fmt::format::PrettyFields::new()),
			)
			.try_init()?;

		tracing::info!("Logging to directory: {}", log_dir.display());
		Ok(())
	} else {
		setup_logging_with_writer(std::io::stdout)
	}
}

/// Setup logging for the application with a custom writer
///
/// Used for stdout logging and by tests that need to capture the output.
pub fn setup_logging_with_writer<W>(writer: W) -> LoggingResult
where
	W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
	tracing_subscriber::registry()
		.with(build_env_filter())
		.with(
			fmt::layer()
				.with_writer(writer)
				.event_format(create_log_format(true))
				.fmt_fields(fmt::format::PrettyFields::new()),
		)
		.try_init()?;
	Ok(())
}
