use std::sync::Arc;

use anyhow::Context;
use maintenance_server::config::{Config, StorageKind};
use maintenance_server::service::Maintenance;
use maintenance_server::sessions::SessionPlatform;
use maintenance_server::settings::DEFAULT_CONFIG;
use maintenance_server::state::MaintenanceState;
use maintenance_server::{AppState, create_app, ticker};
use maintenance_store::{
    AccessControlList, ConfigDocument, FileBackend, SqliteBackend, StorageBackend,
};
use tokio::net::TcpListener;

const CONFIG_FILE: &str = "config.yml";
const WHITELIST_FILE: &str = "WhitelistedPlayers.yml";
const SETTINGS_TABLE: &str = "maintenance_settings";
const WHITELIST_TABLE: &str = "maintenance_whitelist";

/// Open the config and whitelist backends for the configured storage.
fn open_backends(
    config: &Config,
) -> anyhow::Result<(Box<dyn StorageBackend>, Box<dyn StorageBackend>)> {
    let backends: (Box<dyn StorageBackend>, Box<dyn StorageBackend>) = match config.storage {
        StorageKind::File => (
            Box::new(FileBackend::new(config.data_dir.join(CONFIG_FILE))),
            Box::new(FileBackend::new(config.data_dir.join(WHITELIST_FILE))),
        ),
        StorageKind::Sqlite => (
            Box::new(
                SqliteBackend::open(&config.database_path, SETTINGS_TABLE)
                    .with_context(|| format!("opening {}", config.database_path))?,
            ),
            Box::new(
                SqliteBackend::open(&config.database_path, WHITELIST_TABLE)
                    .with_context(|| format!("opening {}", config.database_path))?,
            ),
        ),
    };
    Ok(backends)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting maintenance server...");

    // Load configuration from environment variables or use defaults
    let config = Config::from_env();
    tracing::info!(
        "Configuration: port={}, storage={:?}, data_dir={}, db_path={}, body_limit={}KB, timeout={}s",
        config.port,
        config.storage,
        config.data_dir.display(),
        config.database_path,
        config.request_body_limit / 1024,
        config.request_timeout.as_secs(),
    );
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set, admin routes are unauthenticated");
    }

    let (settings_backend, whitelist_backend) = open_backends(&config)?;
    let settings_doc = ConfigDocument::provision(settings_backend, DEFAULT_CONFIG)
        .context("loading maintenance config")?;
    let whitelist_doc =
        ConfigDocument::provision(whitelist_backend, "").context("loading whitelist")?;

    let whitelist = Arc::new(AccessControlList::load(whitelist_doc).context("reading whitelist")?);
    let sessions = Arc::new(SessionPlatform::new(whitelist.clone(), config.max_players));
    let service = Arc::new(Maintenance::new(
        MaintenanceState::load(settings_doc),
        whitelist,
        sessions.clone(),
    ));

    let resume = service.resume();
    tracing::debug!(?resume, "crash recovery finished");

    let ticker = ticker::spawn_ticker(service.clone());

    let app = create_app(
        AppState {
            service,
            sessions,
            admin_token: config.admin_token.clone(),
            task_timeout: config.request_timeout,
        },
        config.request_body_limit,
        config.request_timeout,
    );
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    ticker.abort();
    tracing::info!("Maintenance server stopped");
    result.context("axum server error")
}
