//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::vault::SecretStore;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// The secret store is injected so handlers can be exercised against a fake
/// store in tests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub secrets: Arc<dyn SecretStore>,
}

impl AppState {
    /// Creates a new application state from the given configuration and secret store.
    pub fn new(config: AppConfig, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            config: Arc::new(config),
            secrets,
        }
    }
}
