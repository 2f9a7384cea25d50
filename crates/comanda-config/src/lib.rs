//! Configuration module for the comanda service.
//!
//! This module provides structures and utilities for managing board
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files for better organization:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the comanda service.
///
/// Contains all sections required for the board to operate: the board
/// instance itself, the remote backend client, the local cache, and the
/// HTTP API consumed by the console.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this board instance.
	pub board: BoardConfig,
	/// Configuration for the remote backend client.
	pub backend: BackendConfig,
	/// Configuration for the local cache.
	pub storage: StorageConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to a board instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardConfig {
	/// Unique identifier for this board instance.
	pub id: String,
	/// Interval in seconds between background refreshes of the selected
	/// branch. Defaults to 30 seconds if not specified.
	#[serde(default = "default_refresh_interval_seconds")]
	pub refresh_interval_seconds: u64,
}

/// Returns the default background refresh interval in seconds.
fn default_refresh_interval_seconds() -> u64 {
	30
}

/// Configuration for the remote backend client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of backend implementation names to their configurations.
	/// Each implementation has its own format stored as raw TOML values.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the local cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired cache entries.
	pub cleanup_interval_seconds: u64,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// CORS configuration for the console origin.
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	/// Allowed origins for CORS.
	pub allowed_origins: Vec<String>,
	/// Allowed headers for CORS.
	pub allowed_headers: Vec<String>,
	/// Allowed methods for CORS.
	pub allowed_methods: Vec<String>,
}

/// Returns the default API host.
fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

/// Returns the default API port.
fn default_api_port() -> u16 {
	3000
}

/// Returns the default API timeout in seconds.
fn default_api_timeout() -> u64 {
	30
}

/// Returns the default maximum request size in bytes.
fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).unwrap();
		let var_name = cap.get(1).unwrap().as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file.
	///
	/// Supports modular configuration through include directives:
	/// `include = ["file1.toml", "file2.toml"]`. Each top-level section must
	/// be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all required fields are set.
	///
	/// - Ensures the board id is not empty and the refresh interval is sane
	/// - Validates that the primary storage and backend implementations exist
	/// - Checks cleanup interval bounds
	fn validate(&self) -> Result<(), ConfigError> {
		if self.board.id.is_empty() {
			return Err(ConfigError::Validation("Board ID cannot be empty".into()));
		}
		if self.board.refresh_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Board refresh_interval_seconds must be greater than 0".into(),
			));
		}
		if self.board.refresh_interval_seconds > 3600 {
			return Err(ConfigError::Validation(
				"Board refresh_interval_seconds cannot exceed 3600 (1 hour)".into(),
			));
		}

		if self.backend.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one backend implementation must be configured".into(),
			));
		}
		if self.backend.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Backend primary implementation cannot be empty".into(),
			));
		}
		if !self
			.backend
			.implementations
			.contains_key(&self.backend.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary backend '{}' not found in implementations",
				self.backend.primary
			)));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base_config() -> &'static str {
		r#"
[board]
id = "comanda-centro"

[backend]
primary = "http"
[backend.implementations.http]
base_url = "http://localhost:9000"

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]
"#
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TEST_BACKEND_HOST", "localhost");
		std::env::set_var("TEST_BACKEND_PORT", "9000");

		let input = "base_url = \"http://${TEST_BACKEND_HOST}:${TEST_BACKEND_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "base_url = \"http://localhost:9000\"");

		std::env::remove_var("TEST_BACKEND_HOST");
		std::env::remove_var("TEST_BACKEND_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_parses() {
		let config: Config = base_config().parse().unwrap();
		assert_eq!(config.board.id, "comanda-centro");
		assert_eq!(config.board.refresh_interval_seconds, 30);
		assert!(config.api.is_none());
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("TEST_BOARD_ID", "comanda-oeste");

		let config_str = r#"
[board]
id = "${TEST_BOARD_ID}"

[backend]
primary = "http"
[backend.implementations.http]
base_url = "http://localhost:9000"

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.board.id, "comanda-oeste");

		std::env::remove_var("TEST_BOARD_ID");
	}

	#[test]
	fn test_unknown_primary_backend_rejected() {
		let config_str = r#"
[board]
id = "comanda-centro"

[backend]
primary = "grpc"
[backend.implementations.http]
base_url = "http://localhost:9000"

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]
"#;

		let result = Config::from_str(config_str);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("Primary backend 'grpc' not found"));
	}

	#[test]
	fn test_zero_refresh_interval_rejected() {
		let config_str = r#"
[board]
id = "comanda-centro"
refresh_interval_seconds = 0

[backend]
primary = "http"
[backend.implementations.http]
base_url = "http://localhost:9000"

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]
"#;

		let result = Config::from_str(config_str);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("refresh_interval_seconds"));
	}

	#[test]
	fn test_cleanup_interval_bounds() {
		let config_str = r#"
[board]
id = "comanda-centro"

[backend]
primary = "http"
[backend.implementations.http]
base_url = "http://localhost:9000"

[storage]
primary = "memory"
cleanup_interval_seconds = 90000
[storage.implementations.memory]
"#;

		let result = Config::from_str(config_str);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("86400"));
	}

	#[test]
	fn test_api_defaults() {
		let config_str = r#"
[board]
id = "comanda-centro"

[backend]
primary = "http"
[backend.implementations.http]
base_url = "http://localhost:9000"

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]

[api]
enabled = true
"#;

		let config: Config = config_str.parse().unwrap();
		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 3000);
		assert_eq!(api.timeout_seconds, 30);
	}
}
