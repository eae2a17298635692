//! Filter configuration loading and validation.
//!
//! This module implements the ConfigLoader trait for filter configurations,
//! allowing them to be loaded from JSON files.

use std::{collections::HashMap, fs, path::Path};

use alloy::primitives::U256;
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
	models::{config::error::ConfigError, ConfigLoader, Configuration},
	utils::constants::DEFAULT_CONFIG_DIR,
};

lazy_static! {
	static ref ADDRESS_REGEX: Regex =
		Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("address pattern is valid");
}

/// Checks that a string is a 0x-prefixed 20-byte hex address, in any case
pub fn is_valid_address(address: &str) -> bool {
	ADDRESS_REGEX.is_match(address.trim())
}

fn check_range(
	name: &str,
	field: &str,
	min: Option<U256>,
	max: Option<U256>,
) -> Result<(), ConfigError> {
	if let (Some(min), Some(max)) = (min, max) {
		if min > max {
			return Err(ConfigError::validation_error(
				format!("Minimum {} is greater than maximum {}", field, field),
				None,
				Some(HashMap::from([
					("configuration".to_string(), name.to_string()),
					("min".to_string(), min.to_string()),
					("max".to_string(), max.to_string()),
				])),
			));
		}
	}
	Ok(())
}

impl ConfigLoader for Configuration {
	/// Load all filter configurations from a directory
	///
	/// Reads and parses all JSON files in the specified directory (or default
	/// config directory). A file that cannot be parsed or validated is logged
	/// and left out, so one broken file never hides the others.
	fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>,
	{
		let config_dir = path.unwrap_or(Path::new(DEFAULT_CONFIG_DIR));
		let mut pairs = Vec::new();

		if !config_dir.exists() {
			return Err(ConfigError::file_error(
				"configurations directory not found",
				None,
				Some(HashMap::from([(
					"path".to_string(),
					config_dir.display().to_string(),
				)])),
			));
		}

		for entry in fs::read_dir(config_dir)? {
			let entry = entry?;
			let path = entry.path();

			if !Self::is_json_file(&path) {
				continue;
			}

			let name = path
				.file_stem()
				.and_then(|s| s.to_str())
				.unwrap_or("unknown")
				.to_string();

			match Self::load_from_path(&path) {
				Ok(configuration) => pairs.push((name, configuration)),
				Err(e) => {
					tracing::warn!(path = %path.display(), error = %e, "Skipping configuration file");
				}
			}
		}

		Ok(T::from_iter(pairs))
	}

	/// Load a filter configuration from a specific file
	fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let file = std::fs::File::open(path)?;
		let config: Configuration = serde_json::from_reader(file)?;

		// Validate the config after loading
		config.validate()?;

		Ok(config)
	}

	/// Validate the filter configuration
	fn validate(&self) -> Result<(), ConfigError> {
		if self.name.trim().is_empty() {
			return Err(ConfigError::validation_error(
				"Configuration name is required",
				None,
				Some(HashMap::from([("id".to_string(), self.id.to_string())])),
			));
		}

		for (field, address) in [
			("fromAddress", &self.from_address),
			("toAddress", &self.to_address),
		] {
			if let Some(address) = address {
				if !is_valid_address(address) {
					return Err(ConfigError::validation_error(
						format!("Invalid {}: {}", field, address),
						None,
						Some(HashMap::from([(
							"configuration".to_string(),
							self.name.clone(),
						)])),
					));
				}
			}
		}

		check_range(&self.name, "value", self.min_value, self.max_value)?;
		check_range(
			&self.name,
			"gas price",
			self.min_gas_price,
			self.max_gas_price,
		)?;
		check_range(&self.name, "gas used", self.min_gas_used, self.max_gas_used)?;

		Ok(())
	}
}
