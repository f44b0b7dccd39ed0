//! surveyd - NASA-TLX survey collection service
//!
//! A small HTTP service that persists each submitted questionnaire as
//! one JSON file and serves the aggregated results back for reporting
//! and CSV export.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bind failure, config error, storage failure)

mod cli;
mod config;
mod models;
mod results;
mod server;
mod store;

use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use models::QuestionCatalog;
use results::ResultSet;
use server::AppState;
use std::path::Path;
use std::sync::Arc;
use store::{FileStore, RecordStore};
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("surveyd v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let catalog = load_catalog(&config)?;
    let store = FileStore::new(&config.storage.data_dir);

    // Handle --export: dump the store as CSV and exit
    if let Some(ref output) = args.export {
        return handle_export(&store, &catalog, output).await;
    }

    run_server(config, store, catalog).await
}

/// Handle --init-config: generate a default .surveyd.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".surveyd.toml");

    if path.exists() {
        eprintln!(".surveyd.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .surveyd.toml")?;

    println!("Created .surveyd.toml with default settings.");
    println!("Edit it to customize the bind address, record store, and question catalog.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .surveyd.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Build the question catalog from configuration.
fn load_catalog(config: &Config) -> Result<QuestionCatalog> {
    match config.catalog.questions_file {
        Some(ref path) => {
            info!("Loading question catalog from: {}", path);
            QuestionCatalog::load(Path::new(path))
        }
        None => {
            debug!("No catalog file configured, using built-in NASA-TLX scales");
            Ok(QuestionCatalog::nasa_tlx())
        }
    }
}

/// Handle --export: load the full result set and write it as CSV.
async fn handle_export(
    store: &FileStore,
    catalog: &QuestionCatalog,
    output: &Path,
) -> Result<()> {
    let snapshot = store.scan_all().await.context("Failed to read the record store")?;
    let result_set = ResultSet::from_scan(snapshot);
    let csv = results::generate_csv(&result_set, catalog);

    std::fs::write(output, csv)
        .with_context(|| format!("Failed to write CSV to {}", output.display()))?;

    println!(
        "Exported {} records to {}",
        result_set.len(),
        output.display()
    );
    Ok(())
}

/// Bind the listener and serve until shutdown.
async fn run_server(config: Config, store: FileStore, catalog: QuestionCatalog) -> Result<()> {
    let state = AppState {
        store: Arc::new(store),
        catalog: Arc::new(catalog),
    };
    let app = server::create_router(state, config.server.permissive_cors);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);
    info!("Record store: {}", config.storage.data_dir);

    axum::serve(listener, app).await.context("HTTP server error")?;
    Ok(())
}
