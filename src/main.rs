//! vaultcheck: Key Vault demo web service.
//!
//! This is the application entry point. It loads configuration from an
//! optional TOML file and the environment, initializes tracing, builds the
//! credential chain and Key Vault client, sets up the Axum router, and starts
//! the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vaultcheck::config::{AppConfig, DEFAULT_LOG_FILTER, DEFAULT_VAULT_URL};
use vaultcheck::http::start_server;
use vaultcheck::vault::{
    build_http_client, CachedCredential, DefaultCredential, KeyVaultClient, TokenCredential,
};
use vaultcheck::{create_router, AppState};

/// vaultcheck: echo input or reveal a demo secret from Azure Key Vault
#[derive(Parser, Debug)]
#[command(name = "vaultcheck", version, about)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Log level filter (e.g., "vaultcheck=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration: env > file > defaults
    let config = AppConfig::load(args.config.as_deref())?;

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));
    if config.logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        environment = %config.app.environment,
        public_dir = %config.app.public_dir,
        "Loaded configuration"
    );

    if config.vault.url == DEFAULT_VAULT_URL {
        tracing::warn!("KEY_VAULT_URL is not set, using the placeholder vault URL");
    }

    // Credentials are resolved from the workload's environment
    let http = build_http_client(Duration::from_secs(config.vault.timeout_seconds))?;
    let chain = DefaultCredential::from_env(http.clone(), |key| std::env::var(key).ok());
    tracing::info!(sources = ?chain.source_names(), "Initialized credential chain");

    let credential: Arc<dyn TokenCredential> = Arc::new(CachedCredential::new(Arc::new(chain)));
    let secrets = Arc::new(KeyVaultClient::new(
        http,
        config.vault.url.clone(),
        credential,
    ));

    let state = AppState::new(config.clone(), secrets);
    let app = create_router(state);

    start_server(app, &config).await?;

    Ok(())
}
