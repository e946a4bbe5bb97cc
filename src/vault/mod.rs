//! Secret store gateway.
//!
//! Handlers only see the [`SecretStore`] trait. The production implementation,
//! [`KeyVaultClient`], talks to the Azure Key Vault REST API with a bearer token
//! obtained from an injected [`TokenCredential`]. Tests substitute their own
//! stores without touching the network.

pub mod client;
pub mod credential;

use async_trait::async_trait;

pub use client::{build_http_client, KeyVaultClient};
pub use credential::{
    AccessToken, CachedCredential, ClientSecretCredential, CredentialError, DefaultCredential,
    IdentitySource, ManagedIdentityCredential, StaticTokenCredential, TokenCredential,
};

/// A secret as returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVaultSecret {
    pub name: String,
    pub value: String,
    /// Full versioned identifier, when the store reports one
    pub id: Option<String>,
    pub content_type: Option<String>,
    pub enabled: Option<bool>,
}

/// Error type for secret store operations
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Failed to obtain access token: {0}")]
    Credential(#[from] CredentialError),

    #[error("Invalid secret name '{0}'")]
    InvalidName(String),

    #[error("Key Vault request failed: {0}")]
    Transport(String),

    #[error("Key Vault denied access ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Secret '{0}' was not found in Key Vault")]
    NotFound(String),

    #[error("Key Vault returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Invalid Key Vault response: {0}")]
    InvalidResponse(String),
}

/// Read access to named secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the current version of the named secret.
    async fn get_secret(&self, name: &str) -> Result<KeyVaultSecret, VaultError>;

    /// Base URL of the backing vault, for logging.
    fn vault_url(&self) -> &str;
}
