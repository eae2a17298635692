//! Configuration loading and validation.
//!
//! - `configuration_config`: filter configurations stored as JSON files
//! - `network_config`: chain access and process settings read from the environment

use std::path::Path;

mod configuration_config;
mod error;
mod network_config;

pub use configuration_config::is_valid_address;
pub use error::ConfigError;
pub use network_config::MonitorSettings;

/// Common interface for loading configuration files
pub trait ConfigLoader: Sized {
	/// Load all configuration files from a directory
	///
	/// Files that fail to load or validate are logged and skipped.
	fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>;

	/// Load a single configuration file
	fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	/// Validate the loaded configuration
	fn validate(&self) -> Result<(), ConfigError>;

	/// Check if a file is a JSON file based on its extension
	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}
}
