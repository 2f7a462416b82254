//! viq-vault - Vault Creation Service
//!
//! Guides a vault creation session through asset details, evidence upload
//! and verification, and minting. Exposes the workflow over HTTP REST + SSE.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viq_common::config::{self, AssetDirectoryKind, TomlConfig};
use viq_common::events::EventBus;

use viq_vault::db::{self, SqliteAssetDirectory};
use viq_vault::services::{
    AssetDirectory, HttpAssetDirectory, HttpVerificationClient, NullAssetDirectory, SimulatedLedger,
};
use viq_vault::{AppState, Collaborators};

/// Default HTTP port
const DEFAULT_PORT: u16 = 5730;
/// Default Verification Service base URL
const DEFAULT_VERIFICATION_URL: &str = "http://localhost:5000";
/// Event bus capacity
const EVENT_BUS_CAPACITY: usize = 100;
/// How often idle sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(version, about = "VaultIQ vault creation service")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "VIQ_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long, env = "VIQ_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file (defaults to the platform config location)
    #[arg(short, long, env = "VIQ_CONFIG")]
    config: Option<PathBuf>,

    /// Verification Service base URL
    #[arg(long, env = "VIQ_VERIFICATION_URL")]
    verification_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = config::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing (RUST_LOG overrides the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("viq_vault={0},viq_common={0},tower_http=info", toml_config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting viq-vault (Vault Creation) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve root folder and open the database
    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), "VIQ_ROOT_FOLDER", &toml_config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let db_path = config::database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let db_pool = db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 2: External collaborators
    let verification_url = config::resolve_setting(
        args.verification_url.as_deref(),
        "VIQ_VERIFICATION_URL",
        toml_config.verification_url.as_deref(),
    )
    .unwrap_or_else(|| DEFAULT_VERIFICATION_URL.to_string());
    info!("Verification Service: {}", verification_url);

    let collaborators = Collaborators {
        verification: Arc::new(HttpVerificationClient::new(&verification_url)),
        ledger: Arc::new(SimulatedLedger::new(
            Duration::from_millis(toml_config.ledger.submit_latency_ms),
            Duration::from_millis(toml_config.ledger.confirm_latency_ms),
        )),
        directory: asset_directory(&toml_config, db_pool.clone())?,
    };
    warn!("Using simulated ledger: token ids and transaction references are not on-chain");

    // Step 3: Application state and router
    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let state = AppState::new(db_pool, event_bus, collaborators);

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.evict_idle_sessions().await;
        }
    });

    let app = viq_vault::build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let bind_address = toml_config
        .bind_address
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind_address, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Select the Asset Directory backend from config
fn asset_directory(config: &TomlConfig, pool: sqlx::SqlitePool) -> Result<Arc<dyn AssetDirectory>> {
    let directory: Arc<dyn AssetDirectory> = match config.asset_directory.kind {
        AssetDirectoryKind::Sqlite => {
            info!("Asset directory: local database");
            Arc::new(SqliteAssetDirectory::new(pool))
        }
        AssetDirectoryKind::Http => {
            let url = config
                .asset_directory
                .url
                .as_deref()
                .context("asset_directory.url is required when kind = \"http\"")?;
            info!("Asset directory: {}", url);
            Arc::new(HttpAssetDirectory::new(url))
        }
        AssetDirectoryKind::None => {
            info!("Asset directory: disabled");
            Arc::new(NullAssetDirectory)
        }
    };
    Ok(directory)
}
