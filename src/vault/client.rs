//! Azure Key Vault REST client.
//!
//! Reads secrets with `GET {vault}/secrets/{name}?api-version=7.4` using a
//! bearer token for the Key Vault scope. No retries are attempted; a failed
//! call surfaces immediately as a [`VaultError`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{KeyVaultSecret, SecretStore, TokenCredential, VaultError};
use crate::config::{KEY_VAULT_API_VERSION, KEY_VAULT_SCOPE};

/// Key Vault object names: 1-127 characters of ASCII letters, digits and dashes
const MAX_SECRET_NAME_LEN: usize = 127;

/// Build the HTTP client shared by the vault client and identity credentials.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("vaultcheck/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[derive(Clone)]
pub struct KeyVaultClient {
    http: reqwest::Client,
    /// Vault URL as configured, for display
    vault_url: String,
    /// Vault URL without trailing slash, for building request paths
    base_url: String,
    credential: Arc<dyn TokenCredential>,
}

impl KeyVaultClient {
    pub fn new(
        http: reqwest::Client,
        vault_url: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
    ) -> Self {
        let vault_url = vault_url.into();
        let base_url = vault_url.trim_end_matches('/').to_string();
        Self {
            http,
            vault_url,
            base_url,
            credential,
        }
    }

    fn secret_url(&self, name: &str) -> String {
        format!(
            "{}/secrets/{}?api-version={}",
            self.base_url, name, KEY_VAULT_API_VERSION
        )
    }
}

#[async_trait]
impl SecretStore for KeyVaultClient {
    async fn get_secret(&self, name: &str) -> Result<KeyVaultSecret, VaultError> {
        if !is_valid_secret_name(name) {
            return Err(VaultError::InvalidName(name.to_string()));
        }

        let token = self.credential.get_token(KEY_VAULT_SCOPE).await?;

        tracing::debug!(secret = %name, vault = %self.base_url, "Fetching secret");
        let response = self
            .http
            .get(self.secret_url(name))
            .bearer_auth(&token.token)
            .send()
            .await
            .map_err(|err| VaultError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| VaultError::Transport(err.to_string()))?;

        match status {
            status if status.is_success() => parse_secret_bundle(name, &body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(VaultError::Unauthorized {
                status: status.as_u16(),
                message: error_message(&body),
            }),
            StatusCode::NOT_FOUND => Err(VaultError::NotFound(name.to_string())),
            status => Err(VaultError::Service {
                status: status.as_u16(),
                message: error_message(&body),
            }),
        }
    }

    fn vault_url(&self) -> &str {
        &self.vault_url
    }
}

pub fn is_valid_secret_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_SECRET_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretBundle {
    value: Option<String>,
    id: Option<String>,
    content_type: Option<String>,
    attributes: Option<SecretAttributes>,
}

#[derive(Deserialize)]
struct SecretAttributes {
    enabled: Option<bool>,
}

fn parse_secret_bundle(name: &str, body: &str) -> Result<KeyVaultSecret, VaultError> {
    let bundle: SecretBundle = serde_json::from_str(body)
        .map_err(|err| VaultError::InvalidResponse(format!("failed to parse secret bundle: {err}")))?;

    let value = bundle
        .value
        .ok_or_else(|| VaultError::InvalidResponse("secret bundle has no value".to_string()))?;

    Ok(KeyVaultSecret {
        name: name.to_string(),
        value,
        id: bundle.id,
        content_type: bundle.content_type,
        enabled: bundle.attributes.and_then(|attrs| attrs.enabled),
    })
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// Extract a readable message from a Key Vault error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorDetail {
                code: Some(code),
                message: Some(message),
            },
        }) => format!("{code}: {message}"),
        Ok(ErrorEnvelope {
            error: ErrorDetail {
                message: Some(message),
                ..
            },
        }) => message,
        _ if body.trim().is_empty() => "no response body".to_string(),
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::StaticTokenCredential;

    fn client(url: &str) -> KeyVaultClient {
        KeyVaultClient::new(
            reqwest::Client::new(),
            url,
            Arc::new(StaticTokenCredential::new("t")),
        )
    }

    #[test]
    fn test_secret_url_trims_trailing_slash() {
        let client = client("https://demo.vault.azure.net/");
        assert_eq!(
            client.secret_url("demo-secret"),
            "https://demo.vault.azure.net/secrets/demo-secret?api-version=7.4"
        );
        assert_eq!(client.vault_url(), "https://demo.vault.azure.net/");
    }

    #[test]
    fn test_secret_name_validation() {
        assert!(is_valid_secret_name("demo-secret"));
        assert!(is_valid_secret_name("A1"));
        assert!(!is_valid_secret_name(""));
        assert!(!is_valid_secret_name("../keys/master"));
        assert!(!is_valid_secret_name("has space"));
        assert!(!is_valid_secret_name(&"a".repeat(128)));
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected_before_any_request() {
        let client = client("http://127.0.0.1:9");
        let err = client.get_secret("bad/name").await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidName(_)));
    }

    #[test]
    fn test_parse_secret_bundle() {
        let body = r#"{
            "value": "hunter2",
            "id": "https://demo.vault.azure.net/secrets/demo-secret/4387e9f3d6e14c459867679a90fd0f79",
            "contentType": "text/plain",
            "attributes": {"enabled": true, "created": 1493938410}
        }"#;
        let secret = parse_secret_bundle("demo-secret", body).unwrap();
        assert_eq!(secret.name, "demo-secret");
        assert_eq!(secret.value, "hunter2");
        assert_eq!(secret.content_type.as_deref(), Some("text/plain"));
        assert_eq!(secret.enabled, Some(true));
        assert!(secret.id.unwrap().ends_with("4387e9f3d6e14c459867679a90fd0f79"));
    }

    #[test]
    fn test_parse_secret_bundle_without_value() {
        let err = parse_secret_bundle("demo-secret", r#"{"id":"x"}"#).unwrap_err();
        assert!(matches!(err, VaultError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_secret_bundle_garbage() {
        let err = parse_secret_bundle("demo-secret", "<html>").unwrap_err();
        assert!(matches!(err, VaultError::InvalidResponse(_)));
    }

    #[test]
    fn test_error_message_formats() {
        assert_eq!(
            error_message(r#"{"error":{"code":"Forbidden","message":"Caller is not authorized"}}"#),
            "Forbidden: Caller is not authorized"
        );
        assert_eq!(
            error_message(r#"{"error":{"message":"Only a message"}}"#),
            "Only a message"
        );
        assert_eq!(error_message("  plain text  "), "plain text");
        assert_eq!(error_message(""), "no response body");
    }
}
