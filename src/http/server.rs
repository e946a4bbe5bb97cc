//! HTTP server startup logic.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::AppConfig;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid http.host or http.port: {0}")]
    Address(String),

    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// Bind the listener for the configured address.
pub async fn bind(config: &AppConfig) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.http.host, config.http.port)
        .parse()
        .map_err(|e| ServerError::Address(format!("{}", e)))?;

    Ok(TcpListener::bind(addr).await?)
}

/// Serve requests on an already bound listener until the process exits.
pub async fn serve(listener: TcpListener, app: Router, vault_url: &str) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, port = addr.port(), "Server is running");
    tracing::info!(vault_url = %vault_url, "Key Vault configured");

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))
}

/// Start the HTTP server based on configuration.
///
/// This function blocks until the server stops.
pub async fn start_server(app: Router, config: &AppConfig) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve(listener, app, &config.vault.url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let mut config = AppConfig::default();
        config.http.host = "127.0.0.1".to_string();
        config.http.port = 0;

        let listener = bind(&config).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_host() {
        let mut config = AppConfig::default();
        config.http.host = "not an address".to_string();

        assert!(matches!(bind(&config).await, Err(ServerError::Address(_))));
    }
}
