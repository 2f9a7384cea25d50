//! Main entry point for the comanda service.
//!
//! This binary runs the order-tracking board for the El Buen Sabor admin
//! console: it keeps a local cache of branch orders synchronized with the
//! remote REST API, applies role-gated lifecycle transitions, and serves the
//! HTTP API the console view layer consumes.

use clap::Parser;
use comanda_config::Config;
use comanda_core::{BoardBuilder, BoardEngine, BoardFactories};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

// Import implementations from individual crates
use comanda_remote::implementations::http::create_backend as create_http_backend;
use comanda_storage::implementations::file::create_storage as create_file_storage;
use comanda_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the comanda service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the comanda service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the board engine with all implementations
/// 5. Runs the board (and the API server, when enabled) until interrupted
#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started comanda");

	// Load configuration
	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| anyhow::anyhow!("Configuration path is not valid UTF-8"))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.board.id);

	// Build board engine with implementations
	let board = build_board(config.clone())?;
	let board = Arc::new(board);

	// Check if API server should be started
	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);

	if api_enabled {
		let api_config = config
			.api
			.clone()
			.ok_or_else(|| anyhow::anyhow!("API enabled but not configured"))?;
		let api_board = Arc::clone(&board);

		// Run the board loop and the API server concurrently
		let board_task = board.run();
		let api_task = server::start_server(api_config, api_board);

		tokio::select! {
			result = board_task => {
				tracing::info!("Board finished");
				result?;
			}
			result = api_task => {
				tracing::info!("API server finished");
				result.map_err(|e| anyhow::anyhow!(e))?;
			}
		}
	} else {
		tracing::info!("Starting board only");
		board.run().await?;
	}

	tracing::info!("Stopped comanda");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type coercion
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the board engine with all necessary implementations.
///
/// This function wires up the concrete implementations for:
/// - Storage backends (in-memory, file)
/// - Remote backend clients (HTTP)
fn build_board(config: Config) -> anyhow::Result<BoardEngine> {
	let builder = BoardBuilder::new(config);

	let storage_factories = create_factory_map!(
		comanda_storage::StorageInterface,
		comanda_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let backend_factories = create_factory_map!(
		comanda_remote::BackendInterface,
		comanda_remote::RemoteError,
		"http" => create_http_backend,
	);

	let factories = BoardFactories {
		storage_factories,
		backend_factories,
	};

	Ok(builder.build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn test_config_str() -> &'static str {
		r#"
[board]
id = "comanda-test"
refresh_interval_seconds = 5

[backend]
primary = "http"
[backend.implementations.http]
base_url = "http://localhost:9000"

[storage]
primary = "memory"
cleanup_interval_seconds = 120
[storage.implementations.memory]

[api]
enabled = true
host = "127.0.0.1"
port = 3210
"#
	}

	#[test]
	fn test_args_default_values() {
		let args = Args {
			config: PathBuf::from("config.toml"),
			log_level: "info".to_string(),
		};

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_create_factory_map_macro() {
		use comanda_storage::{StorageError, StorageInterface};

		let factories = create_factory_map!(
			StorageInterface,
			StorageError,
			"memory" => create_memory_storage,
			"file" => create_file_storage,
		);

		assert_eq!(factories.len(), 2);
		assert!(factories.contains_key("memory"));
		assert!(factories.contains_key("file"));
	}

	#[test]
	fn test_backend_factories_creation() {
		let backend_factories = create_factory_map!(
			comanda_remote::BackendInterface,
			comanda_remote::RemoteError,
			"http" => create_http_backend,
		);

		assert_eq!(backend_factories.len(), 1);
		assert!(backend_factories.contains_key("http"));
	}

	#[tokio::test]
	async fn test_build_board_with_file_config() {
		let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
		let config_path = temp_dir.path().join("test_config.toml");

		std::fs::write(&config_path, test_config_str()).expect("Failed to write config");

		let config = Config::from_file(config_path.to_str().unwrap())
			.await
			.expect("Failed to load config");
		assert_eq!(config.board.id, "comanda-test");
		assert_eq!(config.board.refresh_interval_seconds, 5);

		let board = build_board(config).expect("Failed to build board");
		assert_eq!(board.config().board.id, "comanda-test");
		assert_eq!(board.revision(), 0);
	}

	#[tokio::test]
	async fn test_build_board_rejects_missing_backend_config() {
		let config_str = r#"
[board]
id = "comanda-test"

[backend]
primary = "http"
[backend.implementations.http]
base_url = "http://localhost:9000"

[storage]
primary = "memory"
cleanup_interval_seconds = 120
[storage.implementations.memory]
"#;
		let mut config: Config = config_str.parse().expect("Failed to parse config");
		// Simulate a backend section whose factory is unknown
		config.backend.primary = "grpc".to_string();
		config
			.backend
			.implementations
			.insert("grpc".to_string(), toml::Value::Table(Default::default()));

		let result = build_board(config);
		assert!(result.is_err());
	}
}
