//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt;

use vaultcheck::config::AppConfig;
use vaultcheck::vault::{KeyVaultSecret, SecretStore, VaultError};
use vaultcheck::{create_router, AppState};

pub const FAKE_VAULT_URL: &str = "https://fake.vault.azure.net/";

enum Behavior {
    Value(String),
    Fail(String),
    Panic,
}

/// In-memory secret store that records every lookup
pub struct FakeSecretStore {
    behavior: Behavior,
    calls: Mutex<Vec<String>>,
}

impl FakeSecretStore {
    pub fn with_value(value: &str) -> Arc<Self> {
        Self::new(Behavior::Value(value.to_string()))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(Behavior::Fail(message.to_string()))
    }

    pub fn panicking() -> Arc<Self> {
        Self::new(Behavior::Panic)
    }

    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn get_secret(&self, name: &str) -> Result<KeyVaultSecret, VaultError> {
        self.calls.lock().unwrap().push(name.to_string());

        match &self.behavior {
            Behavior::Value(value) => Ok(KeyVaultSecret {
                name: name.to_string(),
                value: value.clone(),
                id: None,
                content_type: None,
                enabled: Some(true),
            }),
            Behavior::Fail(message) => Err(VaultError::Unauthorized {
                status: 403,
                message: message.clone(),
            }),
            Behavior::Panic => panic!("secret store exploded"),
        }
    }

    fn vault_url(&self) -> &str {
        FAKE_VAULT_URL
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.app.environment = "test".to_string();
    config.vault.url = FAKE_VAULT_URL.to_string();
    config
}

pub fn app_with(config: AppConfig, store: Arc<dyn SecretStore>) -> Router {
    create_router(AppState::new(config, store))
}

pub fn app(store: Arc<dyn SecretStore>) -> Router {
    app_with(test_config(), store)
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn post_json(app: Router, uri: &str, body: &str) -> Response<Body> {
    send(
        app,
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
