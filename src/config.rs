//! Configuration loading and constants.
//!
//! Settings come from three layers, lowest priority first: built-in defaults,
//! an optional TOML file, and process environment variables. `AppConfig` is the
//! root configuration struct containing all settings.

use const_format::formatcp;
use serde::Deserialize;
use std::path::Path;

// =============================================================================
// HTTP Response Cache Control
// =============================================================================

/// Static assets (landing page, CSS, JS) - short cache, the demo page changes rarely
pub const HTTP_CACHE_STATIC_MAX_AGE: u32 = 300;

pub const CACHE_CONTROL_STATIC: &str = formatcp!("public, max-age={}", HTTP_CACHE_STATIC_MAX_AGE);

/// API responses may carry secret material and must never be stored
pub const CACHE_CONTROL_API: &str = "no-store";

// =============================================================================
// Key Vault Constants
// =============================================================================

/// The one secret this service knows how to reveal
pub const DEMO_SECRET_NAME: &str = "demo-secret";

/// Input value (compared case-insensitively) that triggers the secret lookup
pub const SECRET_TRIGGER: &str = "secret";

/// Key Vault REST API version for secret operations
pub const KEY_VAULT_API_VERSION: &str = "7.4";

/// OAuth2 scope for Key Vault data plane tokens
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Seconds before token expiry at which a cached token is considered stale
pub const TOKEN_REFRESH_SKEW_SECS: i64 = 60;

// =============================================================================
// Default Values
// =============================================================================

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Placeholder vault URL used when KEY_VAULT_URL is not set
pub const DEFAULT_VAULT_URL: &str = "https://your-keyvault.vault.azure.net/";

/// Timeout applied to vault and identity HTTP requests
pub const DEFAULT_VAULT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Directory holding index.html and other static assets
pub const DEFAULT_PUBLIC_DIR: &str = "public";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "vaultcheck=debug,tower_http=debug";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

// =============================================================================
// Environment Variable Names
// =============================================================================

pub const ENV_PORT: &str = "PORT";
pub const ENV_KEY_VAULT_URL: &str = "KEY_VAULT_URL";
pub const ENV_ENVIRONMENT: &str = "NODE_ENV";
pub const ENV_PUBLIC_DIR: &str = "PUBLIC_DIR";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Key Vault connection settings
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub app: AppSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_PORT
    }
}

/// Key Vault settings
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Vault base URL, e.g. https://my-vault.vault.azure.net/
    #[serde(default = "VaultConfig::default_url")]
    pub url: String,
    /// Request timeout in seconds for vault and identity calls
    #[serde(default = "VaultConfig::default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            timeout_seconds: Self::default_timeout(),
        }
    }
}

impl VaultConfig {
    fn default_url() -> String {
        DEFAULT_VAULT_URL.to_string()
    }

    fn default_timeout() -> u64 {
        DEFAULT_VAULT_TIMEOUT_SECS
    }
}

/// Application-level settings reported to clients or used for asset lookup
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// Deployment environment name, reported by /health only
    #[serde(default = "AppSettings::default_environment")]
    pub environment: String,
    #[serde(default = "AppSettings::default_public_dir")]
    pub public_dir: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            environment: Self::default_environment(),
            public_dir: Self::default_public_dir(),
        }
    }
}

impl AppSettings {
    fn default_environment() -> String {
        DEFAULT_ENVIRONMENT.to_string()
    }

    fn default_public_dir() -> String {
        DEFAULT_PUBLIC_DIR.to_string()
    }

    /// Path of the landing page served at `/`
    pub fn index_path(&self) -> std::path::PathBuf {
        Path::new(&self.public_dir).join("index.html")
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Override settings from environment variables.
    ///
    /// The lookup is injected so tests don't have to mutate the process environment.
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(port) = get(ENV_PORT) {
            self.http.port = port.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("{ENV_PORT} must be a port number, got '{port}'"))
            })?;
        }
        if let Some(url) = get(ENV_KEY_VAULT_URL) {
            self.vault.url = url.trim().to_string();
        }
        if let Some(environment) = get(ENV_ENVIRONMENT) {
            self.app.environment = environment;
        }
        if let Some(dir) = get(ENV_PUBLIC_DIR) {
            self.app.public_dir = dir;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.vault.url.to_ascii_lowercase();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "vault.url must be an http(s) URL, got '{}'",
                self.vault.url
            )));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::Validation(format!(
                "logging.format must be \"text\" or \"json\", got '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
