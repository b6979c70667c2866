//! Secret sources for the credential pool.

use async_trait::async_trait;
use keyring::Entry;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret '{0}' not found")]
    NotFound(String),

    #[error("secret '{0}' is empty")]
    Empty(String),

    #[error("secret source unavailable: {0}")]
    Unavailable(String),
}

/// Privileged store holding the comma-separated credential string.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn fetch_secret(&self, name: &str) -> Result<String, SecretError>;

    fn name(&self) -> &'static str;
}

/// OS keyring (`service`, `name`) entry.
#[derive(Debug, Clone)]
pub struct KeyringSecretSource {
    service: String,
}

impl KeyringSecretSource {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[async_trait]
impl SecretSource for KeyringSecretSource {
    async fn fetch_secret(&self, name: &str) -> Result<String, SecretError> {
        let service = self.service.clone();
        let user = name.to_string();
        // keyring calls block on platform IPC
        let result = tokio::task::spawn_blocking(move || {
            Entry::new(&service, &user).and_then(|entry| entry.get_password())
        })
        .await
        .map_err(|e| SecretError::Unavailable(e.to_string()))?;

        match result {
            Ok(value) if value.trim().is_empty() => Err(SecretError::Empty(name.to_string())),
            Ok(value) => Ok(value),
            Err(keyring::Error::NoEntry) => Err(SecretError::NotFound(name.to_string())),
            Err(e) => Err(SecretError::Unavailable(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "keyring"
    }
}

/// Reads the secret from the environment variable of the same name.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretSource;

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn fetch_secret(&self, name: &str) -> Result<String, SecretError> {
        match env::var(name) {
            Ok(value) if value.trim().is_empty() => Err(SecretError::Empty(name.to_string())),
            Ok(value) => Ok(value),
            Err(_) => Err(SecretError::NotFound(name.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "env"
    }
}

/// Fixed value, or a fixed failure. Mostly useful in tests.
#[derive(Debug, Clone)]
pub struct StaticSecretSource {
    value: Option<String>,
}

impl StaticSecretSource {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }

    pub fn missing() -> Self {
        Self { value: None }
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn fetch_secret(&self, name: &str) -> Result<String, SecretError> {
        self.value
            .clone()
            .ok_or_else(|| SecretError::NotFound(name.to_string()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
