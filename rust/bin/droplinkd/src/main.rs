//! `droplinkd`: the Droplink server binary.
//!
//! Usage:
//!   droplinkd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/droplink/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use droplink::DroplinkModule;
use droplink_core::{Module, SystemClock};

use config::ServerConfig;

/// Droplink server.
#[derive(Parser, Debug)]
#[command(name = "droplinkd", about = "Droplink server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides `[server] listen`).
    #[arg(long = "listen")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    bootstrap::verify_config(&server_config)?;

    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let core_config = droplink_core::ServiceConfig::with_data_dir(&data_dir);

    let kv: Arc<dyn droplink_kv::KVStore> = Arc::new(
        droplink_kv::RedbStore::open(&core_config.resolve_db_path())
            .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?,
    );
    let sql: Arc<dyn droplink_sql::SQLStore> = Arc::new(
        droplink_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    let module = DroplinkModule::new(
        sql,
        kv,
        Arc::new(SystemClock),
        server_config.droplink_config(),
    )?;
    info!(
        "Droplink module initialized (Pi network: {:?}, sandbox: {})",
        server_config.pi.network,
        server_config.pi.sandbox()
    );

    bootstrap::seed_forum(module.service())?;
    bootstrap::sweep_ad_grants(module.service())?;

    let app = routes::build_router(vec![(module.name(), module.routes())]);

    let listen = cli.listen.unwrap_or(server_config.server.listen);
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!("Droplink server listening on {}", listen);
    axum::serve(listener, app).await?;

    Ok(())
}
