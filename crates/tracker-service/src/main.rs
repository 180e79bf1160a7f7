//! Main entry point for the order dispatch tracker.
//!
//! Loads configuration, assembles the tracker from the configured record
//! store and order source, and serves the HTTP API.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracker_config::Config;
use tracker_core::{TrackerBuilder, TrackerEngine, TrackerFactories};

mod apis;
mod server;

use tracker_orders::implementations::memory::create_source as create_memory_source;
use tracker_orders::implementations::sanity::create_source as create_sanity_source;
use tracker_storage::implementations::file::create_storage as create_file_storage;
use tracker_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the tracker service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/tracker.toml", env = "TRACKER_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started tracker");

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {:?}", args.config))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.tracker.id);

	let engine = Arc::new(build_tracker(config.clone())?);

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => server::start_server(api_config, engine).await?,
		None => {
			// Without the API there is nothing to serve; report and exit.
			let scan = engine.tracker().scan().await?;
			let completed = scan.records.iter().filter(|r| r.is_completed()).count();
			tracing::info!(
				dispatched = scan.records.len(),
				completed,
				degraded = scan.degraded,
				"API disabled, nothing to serve"
			);
		},
	}

	tracing::info!("Stopped tracker");
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

/// Builds the tracker engine with every built-in implementation available.
fn build_tracker(config: Config) -> Result<TrackerEngine, Box<dyn std::error::Error>> {
	let storage_factories = create_factory_map!(
		tracker_storage::RecordStore,
		tracker_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let order_source_factories = create_factory_map!(
		tracker_orders::OrderSourceInterface,
		tracker_orders::OrderSourceError,
		"memory" => create_memory_source,
		"sanity" => create_sanity_source,
	);

	let factories = TrackerFactories {
		storage_factories,
		order_source_factories,
	};

	Ok(TrackerBuilder::new(config).build(factories)?)
}
