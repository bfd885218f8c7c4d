//! Alert index synchronizer server
//!
//! Keeps the Redis index read by the alert evaluation runtime consistent
//! with the relational store of alert instances, templates, channel
//! endpoints and groups.

mod api;
mod config;
mod listener;
mod server;
mod shutdown;
mod state;

use alertsync_core::config::{ConfigStore, IndexStoreConfig};
use alertsync_core::events::index_event_channel;
use alertsync_core::framework::DatabaseProcessor;
use alertsync_core::index::{IndexError, MemoryIndexStore, RedisIndexStore, SharedIndexStore};
use alertsync_core::processors::{FullResync, IndexDispatcher};
use clap::{Parser, Subcommand};
use config::file::LogFormat;
use config::{ConfigLoader, get_database_url};
use kanau::processor::Processor;
use listener::NotificationListener;
use server::{build_router, run_server};
use shutdown::{spawn_config_reload_handler, spawn_shutdown_handler};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Alert index synchronizer
#[derive(Parser, Debug)]
#[command(name = "alertsync-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./alertsync.toml", env = "ALERTSYNC_CONFIG")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Listen for change notifications and serve the HTTP API (default)
    Serve,
    /// Rebuild every projection from the database, then exit
    Resync {
        /// Rows fetched per query; defaults to `sync.resync_batch_size`
        #[arg(long)]
        batch_size: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging is configured from the file, so the file is read first.
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load()?;
    init_tracing(loaded_config.log_format);

    tracing::info!("Starting alertsync-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Configuration loaded from {:?}", args.config);

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    let (index, redis) = connect_index(&loaded_config.index).await.map_err(|e| {
        tracing::error!("Failed to connect to index store: {}", e);
        e
    })?;

    let runtime_sync = ConfigStore::new(loaded_config.runtime_sync);
    let dispatcher = Arc::new(IndexDispatcher::new(
        index.clone(),
        Arc::new(DatabaseProcessor {
            pool: db_pool.clone(),
        }),
        loaded_config.sync.clone(),
        runtime_sync.clone(),
    ));

    let result = match args.command.unwrap_or(Command::Serve) {
        Command::Resync { batch_size } => {
            let batch_size = batch_size.unwrap_or(loaded_config.resync_batch_size);
            let report = dispatcher.process(FullResync { batch_size }).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Serve => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            spawn_shutdown_handler(shutdown_tx);

            let admin = Arc::new(RwLock::new(loaded_config.admin));
            spawn_config_reload_handler(
                config_loader,
                admin.clone(),
                runtime_sync.clone(),
                shutdown_rx.clone(),
            );

            let (event_tx, event_rx) = index_event_channel();
            let dispatcher_task = tokio::spawn(dispatcher.clone().run(
                shutdown_rx.clone(),
                event_rx,
                runtime_sync.subscribe(),
            ));

            let listener = NotificationListener::new(
                db_pool.clone(),
                loaded_config.listener.channel,
                event_tx,
            );
            let listener_shutdown = shutdown_rx.clone();
            let listener_task = tokio::spawn(async move {
                if let Err(e) = listener.run(listener_shutdown).await {
                    tracing::error!(error = %e, "Notification listener failed");
                }
            });

            let state = AppState {
                db: db_pool.clone(),
                index,
                dispatcher,
                admin,
                resync_batch_size: loaded_config.resync_batch_size,
            };
            let router = build_router(state);

            tracing::info!("Starting HTTP server on {}", loaded_config.server.listen);
            let served = run_server(router, loaded_config.server.listen, shutdown_rx).await;

            // Both loops watch the same shutdown flag.
            let _ = listener_task.await;
            let _ = dispatcher_task.await;
            served.map_err(Into::into)
        }
    };

    if let Some(redis) = redis {
        redis.close();
    }
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result
}

/// Open the index store named by the config.
///
/// The Redis handle is returned separately so it can be closed on shutdown.
async fn connect_index(
    config: &IndexStoreConfig,
) -> Result<(SharedIndexStore, Option<RedisIndexStore>), IndexError> {
    if config.is_in_memory() {
        tracing::warn!("Using the in-memory index store; projections are not persisted");
        return Ok((Arc::new(MemoryIndexStore::new()), None));
    }
    let redis = RedisIndexStore::connect(config).await?;
    Ok((Arc::new(redis.clone()), Some(redis)))
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
