//! Main entry point for the order API service.
//!
//! Loads the configuration, connects the configured storage backend and
//! serves the `/orders` HTTP API until interrupted.

use clap::Parser;
use order_config::Config;
use order_core::{OrderEngine, OrderEngineBuilder, OrderFactories};
use std::path::PathBuf;

mod apis;
mod server;

use order_storage::implementations::file::create_storage as create_file_storage;
use order_storage::implementations::memory::create_storage as create_memory_storage;
use order_storage::implementations::redis::create_storage as create_redis_storage;

/// Command-line arguments for the order service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "ORDER_API_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the order service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engine and checks the storage backend
/// 5. Serves the API until a shutdown signal, then releases storage
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started order service");

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {:?}", args.config))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let engine = build_engine(config).await?;

	server::start_server(&engine, server::shutdown_signal()).await?;

	engine.shutdown();
	tracing::info!("Stopped order service");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
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

/// Builds the engine with every storage backend this binary ships.
async fn build_engine(config: Config) -> Result<OrderEngine, Box<dyn std::error::Error>> {
	let builder = OrderEngineBuilder::new(config);

	let storage_factories = create_factory_map!(
		order_storage::StorageInterface,
		order_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
		"redis" => create_redis_storage,
	);

	Ok(builder.build(OrderFactories { storage_factories }).await?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use order_config::builders::ConfigBuilder;
	use tempfile::tempdir;

	#[test]
	fn test_args_defaults() {
		let args = Args::try_parse_from(["order-api"]).unwrap();
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args =
			Args::try_parse_from(["order-api", "--config", "custom.toml", "-l", "debug"]).unwrap();
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[test]
	fn test_storage_factories_creation() {
		let storage_factories = create_factory_map!(
			order_storage::StorageInterface,
			order_storage::StorageError,
			"file" => create_file_storage,
			"memory" => create_memory_storage,
			"redis" => create_redis_storage,
		);

		assert_eq!(storage_factories.len(), 3);
		for name in ["file", "memory", "redis"] {
			assert!(storage_factories.contains_key(name));
		}
	}

	#[tokio::test]
	async fn test_build_engine_with_minimal_config() {
		let config = ConfigBuilder::new().service_id("test-orders").build();

		let engine = build_engine(config).await.unwrap();
		assert_eq!(engine.config().service.id, "test-orders");
	}

	#[tokio::test]
	async fn test_build_engine_from_file_config() {
		let temp_dir = tempdir().unwrap();
		let data_dir = temp_dir.path().join("orders");
		let config_path = temp_dir.path().join("config.toml");

		let config_content = format!(
			r#"
[service]
id = "file-orders"
shutdown_grace_seconds = 3

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{}"

[api]
port = 0
page_size = 10
"#,
			data_dir.display()
		);
		std::fs::write(&config_path, config_content).unwrap();

		let config = Config::from_file(config_path.to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.service.shutdown_grace_seconds, 3);

		let engine = build_engine(config).await.unwrap();
		// Startup ping creates the storage directory
		assert!(data_dir.exists());
		assert_eq!(engine.config().api.page_size, 10);
	}
}
