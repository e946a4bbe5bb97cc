//! Token credentials for the Key Vault data plane.
//!
//! Supports:
//! - **Managed identity**: App Service identity endpoint or the instance metadata service
//! - **Client secret**: OAuth2 client credentials flow against Entra ID
//! - **Static token**: a fixed bearer, used with local emulators
//!
//! [`DefaultCredential`] tries each configured source in order, and
//! [`CachedCredential`] reuses tokens until shortly before they expire.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::TOKEN_REFRESH_SKEW_SECS;

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";
/// Lifetime assumed when an identity endpoint omits expiry information
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

const ENV_BEARER_TOKEN: &str = "AZURE_KEYVAULT_BEARER_TOKEN";
const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
const ENV_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";
const ENV_IDENTITY_ENDPOINT: &str = "IDENTITY_ENDPOINT";
const ENV_IDENTITY_HEADER: &str = "IDENTITY_HEADER";

/// A bearer token and the instant it stops being valid
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// True while the token has more than the refresh skew left before expiry.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(TOKEN_REFRESH_SKEW_SECS) > now
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Error type for token acquisition
#[derive(Debug, Clone, thiserror::Error)]
pub enum CredentialError {
    #[error("{credential} is not configured: {reason}")]
    Unavailable {
        credential: &'static str,
        reason: String,
    },

    #[error("{credential} token request failed: {message}")]
    Request {
        credential: &'static str,
        message: String,
    },

    #[error("{credential} token request rejected ({status}): {body}")]
    Rejected {
        credential: &'static str,
        status: u16,
        body: String,
    },

    #[error("{credential} returned an invalid token response: {message}")]
    Parse {
        credential: &'static str,
        message: String,
    },

    #[error("no credential produced a token: {}", .0.join("; "))]
    Chain(Vec<String>),
}

/// A source of bearer tokens for a given OAuth2 scope.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError>;

    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;
}

/// Convert a v2 scope ("https://vault.azure.net/.default") to a v1 resource.
pub fn resource_from_scope(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

/// Read an integer that identity endpoints send either as a JSON number or a string.
fn json_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<Value>,
    #[serde(default)]
    expires_on: Option<Value>,
}

impl TokenResponse {
    /// Absolute expiry: `expires_on` (unix seconds) wins over relative `expires_in`.
    fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(at) = self
            .expires_on
            .as_ref()
            .and_then(json_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        {
            return at;
        }

        let lifetime = self
            .expires_in
            .as_ref()
            .and_then(json_i64)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        now + Duration::seconds(lifetime)
    }

    fn into_token(self, now: DateTime<Utc>) -> AccessToken {
        let expires_at = self.expires_at(now);
        AccessToken::new(self.access_token, expires_at)
    }
}

async fn read_token_response(
    credential: &'static str,
    response: reqwest::Response,
) -> Result<AccessToken, CredentialError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CredentialError::Rejected {
            credential,
            status: status.as_u16(),
            body,
        });
    }

    let payload: TokenResponse = response.json().await.map_err(|err| CredentialError::Parse {
        credential,
        message: err.to_string(),
    })?;

    Ok(payload.into_token(Utc::now()))
}

// =============================================================================
// Static token
// =============================================================================

/// Fixed bearer token, never refreshed
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken, CredentialError> {
        Ok(AccessToken::new(
            self.token.clone(),
            Utc::now() + Duration::days(1),
        ))
    }

    fn name(&self) -> &'static str {
        "StaticTokenCredential"
    }
}

// =============================================================================
// Client secret (OAuth2 client credentials)
// =============================================================================

/// Service principal credential using the client credentials grant
#[derive(Clone)]
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Build from AZURE_TENANT_ID / AZURE_CLIENT_ID / AZURE_CLIENT_SECRET.
    ///
    /// Returns `None` unless all three are present.
    pub fn from_env<F>(http: reqwest::Client, lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tenant_id = lookup(ENV_TENANT_ID)?;
        let client_id = lookup(ENV_CLIENT_ID)?;
        let client_secret = lookup(ENV_CLIENT_SECRET)?;
        let credential = Self::new(http, tenant_id, client_id, client_secret);

        Some(match lookup(ENV_AUTHORITY_HOST) {
            Some(host) => credential.with_authority_host(host),
            None => credential,
        })
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        )
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .http
            .post(self.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|err| CredentialError::Request {
                credential: self.name(),
                message: err.to_string(),
            })?;

        read_token_response(self.name(), response).await
    }

    fn name(&self) -> &'static str {
        "ClientSecretCredential"
    }
}

// =============================================================================
// Managed identity
// =============================================================================

/// Where managed identity tokens come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// App Service / Functions identity endpoint with its secret header
    AppService { endpoint: String, header: String },
    /// Instance metadata service (VMs, AKS, Container Instances)
    Imds { endpoint: String },
}

impl IdentitySource {
    /// App Service variables win when both are set; otherwise fall back to IMDS.
    pub fn from_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match (lookup(ENV_IDENTITY_ENDPOINT), lookup(ENV_IDENTITY_HEADER)) {
            (Some(endpoint), Some(header)) => IdentitySource::AppService { endpoint, header },
            _ => IdentitySource::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        }
    }
}

/// Workload identity provided by the hosting platform
#[derive(Clone)]
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    source: IdentitySource,
    /// Client ID of a user-assigned identity; system-assigned when `None`
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    pub fn new(http: reqwest::Client, source: IdentitySource, client_id: Option<String>) -> Self {
        Self {
            http,
            source,
            client_id,
        }
    }

    pub fn from_env<F>(http: reqwest::Client, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = lookup(ENV_CLIENT_ID);
        Self::new(http, IdentitySource::from_env(lookup), client_id)
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let resource = resource_from_scope(scope);

        let request = match &self.source {
            IdentitySource::AppService { endpoint, header } => self
                .http
                .get(endpoint)
                .query(&[("api-version", APP_SERVICE_API_VERSION), ("resource", resource)])
                .header("X-IDENTITY-HEADER", header),
            IdentitySource::Imds { endpoint } => self
                .http
                .get(endpoint)
                .query(&[("api-version", IMDS_API_VERSION), ("resource", resource)])
                .header("Metadata", "true"),
        };
        let request = match &self.client_id {
            Some(client_id) => request.query(&[("client_id", client_id.as_str())]),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|err| CredentialError::Request {
                credential: self.name(),
                message: err.to_string(),
            })?;

        read_token_response(self.name(), response).await
    }

    fn name(&self) -> &'static str {
        "ManagedIdentityCredential"
    }
}

// =============================================================================
// Chain and cache
// =============================================================================

/// Ordered chain of credentials; the first one that yields a token wins
#[derive(Clone)]
pub struct DefaultCredential {
    sources: Vec<Arc<dyn TokenCredential>>,
}

impl DefaultCredential {
    pub fn new(sources: Vec<Arc<dyn TokenCredential>>) -> Self {
        Self { sources }
    }

    /// Build the chain from environment: static token, then client secret, then managed identity.
    pub fn from_env<F>(http: reqwest::Client, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut sources: Vec<Arc<dyn TokenCredential>> = Vec::new();

        if let Some(token) = lookup(ENV_BEARER_TOKEN) {
            sources.push(Arc::new(StaticTokenCredential::new(token)));
        }
        if let Some(credential) = ClientSecretCredential::from_env(http.clone(), &lookup) {
            sources.push(Arc::new(credential));
        }
        sources.push(Arc::new(ManagedIdentityCredential::from_env(http, &lookup)));

        Self::new(sources)
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        if self.sources.is_empty() {
            return Err(CredentialError::Unavailable {
                credential: self.name(),
                reason: "no credential sources configured".to_string(),
            });
        }

        let mut failures = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    tracing::debug!(credential = source.name(), "Acquired access token");
                    return Ok(token);
                }
                Err(err) => {
                    tracing::debug!(credential = source.name(), error = %err, "Credential failed");
                    failures.push(err.to_string());
                }
            }
        }

        Err(CredentialError::Chain(failures))
    }

    fn name(&self) -> &'static str {
        "DefaultCredential"
    }
}

/// Caches tokens per scope until they are about to expire.
///
/// The lock is held across a refresh so concurrent requests wait for one
/// token request instead of each issuing their own.
pub struct CachedCredential {
    inner: Arc<dyn TokenCredential>,
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl CachedCredential {
    pub fn new(inner: Arc<dyn TokenCredential>) -> Self {
        Self {
            inner,
            tokens: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenCredential for CachedCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let mut tokens = self.tokens.lock().await;

        if let Some(token) = tokens.get(scope) {
            if token.is_fresh(Utc::now()) {
                return Ok(token.clone());
            }
        }

        let token = self.inner.get_token(scope).await?;
        tokens.insert(scope.to_string(), token.clone());
        Ok(token)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
