//! Lazily loaded credential pool.

use super::secret::{SecretSource, StaticSecretSource};
use crate::{Error, ErrorContext, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

pub const DEFAULT_SECRET_NAME: &str = "GOOGLE_GENAI_API_KEY";
pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "secrets/";

/// An opaque upstream bearer token.
///
/// `Debug` and `Display` print only the fingerprint; use [`Credential::expose`] to
/// hand the raw value to the upstream client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(Arc::from(value.as_ref()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First 8 hex characters of the SHA-256 of the token.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.fingerprint())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key#{}", self.fingerprint())
    }
}

#[derive(Clone)]
pub struct CredentialConfig {
    /// Name of the secret holding the comma-separated credential string.
    pub secret_name: String,
    /// Local configuration value used when the secret source fails.
    pub local_fallback: Option<String>,
    /// Entries starting with this prefix are unresolved placeholders and are dropped.
    pub placeholder_prefix: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            secret_name: DEFAULT_SECRET_NAME.to_string(),
            local_fallback: None,
            placeholder_prefix: DEFAULT_PLACEHOLDER_PREFIX.to_string(),
        }
    }
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("secret_name", &self.secret_name)
            .field("local_fallback", &self.local_fallback.as_ref().map(|_| "<redacted>"))
            .field("placeholder_prefix", &self.placeholder_prefix)
            .finish()
    }
}

impl CredentialConfig {
    pub fn new(secret_name: impl Into<String>) -> Self {
        Self {
            secret_name: secret_name.into(),
            ..Self::default()
        }
    }

    pub fn with_local_fallback(mut self, raw: impl Into<String>) -> Self {
        self.local_fallback = Some(raw.into());
        self
    }

    pub fn with_placeholder_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.placeholder_prefix = prefix.into();
        self
    }
}

/// Splits a comma-separated credential string, dropping blanks and placeholders.
pub fn parse_credentials(raw: &str, placeholder_prefix: &str) -> Vec<Credential> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| placeholder_prefix.is_empty() || !s.starts_with(placeholder_prefix))
        .map(Credential::new)
        .collect()
}

/// Ordered set of interchangeable upstream credentials, loaded exactly once.
///
/// Share one pool per process through an `Arc`. Concurrent first callers of
/// [`CredentialPool::ensure_loaded`] wait on the same load.
pub struct CredentialPool {
    source: Arc<dyn SecretSource>,
    config: CredentialConfig,
    credentials: OnceCell<Vec<Credential>>,
    loads: AtomicUsize,
}

impl CredentialPool {
    pub fn new(source: Arc<dyn SecretSource>, config: CredentialConfig) -> Self {
        Self {
            source,
            config,
            credentials: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Pool that is already loaded with the given credentials.
    pub fn from_credentials<I, S>(credentials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let credentials = credentials.into_iter().map(Credential::new).collect();
        Self {
            source: Arc::new(StaticSecretSource::missing()),
            config: CredentialConfig::default(),
            credentials: OnceCell::new_with(Some(credentials)),
            loads: AtomicUsize::new(0),
        }
    }

    /// Loads the credentials on first call; later calls return immediately.
    ///
    /// Never fails. Finding no usable credential leaves the pool permanently empty,
    /// which [`CredentialPool::get`] reports as a configuration error.
    pub async fn ensure_loaded(&self) -> usize {
        self.credentials.get_or_init(|| self.load()).await.len()
    }

    async fn load(&self) -> Vec<Credential> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let name = self.config.secret_name.as_str();
        let prefix = self.config.placeholder_prefix.as_str();

        match self.source.fetch_secret(name).await {
            Ok(raw) => {
                let credentials = parse_credentials(&raw, prefix);
                if !credentials.is_empty() {
                    info!(
                        source = self.source.name(),
                        secret = name,
                        count = credentials.len(),
                        "loaded credentials"
                    );
                    return credentials;
                }
                warn!(source = self.source.name(), secret = name, "secret holds no usable credentials; using local fallback");
            }
            Err(e) => {
                warn!(source = self.source.name(), secret = name, error = %e, "secret fetch failed; using local fallback");
            }
        }

        let credentials = self
            .config
            .local_fallback
            .as_deref()
            .map(|raw| parse_credentials(raw, prefix))
            .unwrap_or_default();
        if credentials.is_empty() {
            error!(secret = name, "no usable credentials found; upstream calls will fail");
        } else {
            info!(source = "local", count = credentials.len(), "loaded credentials");
        }
        credentials
    }

    /// Number of loaded credentials; 0 before loading.
    pub fn size(&self) -> usize {
        self.credentials.get().map_or(0, Vec::len)
    }

    pub fn is_loaded(&self) -> bool {
        self.credentials.initialized()
    }

    /// Credential at `index mod size()`.
    pub fn get(&self, index: usize) -> Result<Credential> {
        match self.credentials.get() {
            Some(credentials) if !credentials.is_empty() => {
                Ok(credentials[index % credentials.len()].clone())
            }
            _ => Err(Error::configuration_with_context(
                "no usable API credentials configured",
                ErrorContext::new()
                    .with_field_path(self.config.secret_name.clone())
                    .with_source("credential_pool"),
            )),
        }
    }

    /// Fingerprints of the loaded credentials, in pool order.
    pub fn fingerprints(&self) -> Vec<String> {
        self.credentials
            .get()
            .map(|c| c.iter().map(Credential::fingerprint).collect())
            .unwrap_or_default()
    }

    /// How many times a load actually ran (0 or 1).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn secret_name(&self) -> &str {
        &self.config.secret_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_blanks_and_placeholders() {
        let creds = parse_credentials(" k1 , ,secrets/GEMINI_KEY_2, k3,", "secrets/");
        let raw: Vec<&str> = creds.iter().map(Credential::expose).collect();
        assert_eq!(raw, vec!["k1", "k3"]);
    }

    #[test]
    fn test_credential_is_redacted() {
        let cred = Credential::new("AIzaSy-super-secret-value");
        let debug = format!("{:?}", cred);
        let display = cred.to_string();
        assert!(!debug.contains("super-secret"));
        assert!(!display.contains("super-secret"));
        assert_eq!(cred.fingerprint().len(), 8);
        assert_eq!(cred.fingerprint(), Credential::new("AIzaSy-super-secret-value").fingerprint());
    }

    #[test]
    fn test_config_debug_hides_fallback() {
        let config = CredentialConfig::default().with_local_fallback("AIza-raw-key");
        assert!(!format!("{:?}", config).contains("AIza-raw-key"));
    }

    #[tokio::test]
    async fn test_secret_source_wins() {
        let pool = CredentialPool::new(
            Arc::new(StaticSecretSource::new("a,b,c")),
            CredentialConfig::default().with_local_fallback("local"),
        );
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.ensure_loaded().await, 3);
        assert_eq!(pool.get(4).unwrap().expose(), "b");
    }

    #[tokio::test]
    async fn test_falls_back_to_local_value() {
        let pool = CredentialPool::new(
            Arc::new(StaticSecretSource::missing()),
            CredentialConfig::default().with_local_fallback("local-1,secrets/placeholder"),
        );
        assert_eq!(pool.ensure_loaded().await, 1);
        assert_eq!(pool.get(0).unwrap().expose(), "local-1");
    }

    #[tokio::test]
    async fn test_placeholder_only_secret_falls_back() {
        let pool = CredentialPool::new(
            Arc::new(StaticSecretSource::new("secrets/A,secrets/B")),
            CredentialConfig::default().with_local_fallback("real"),
        );
        assert_eq!(pool.ensure_loaded().await, 1);
    }

    #[tokio::test]
    async fn test_empty_pool_is_configuration_error() {
        let pool = CredentialPool::new(Arc::new(StaticSecretSource::missing()), CredentialConfig::default());
        assert_eq!(pool.ensure_loaded().await, 0);
        assert!(pool.is_loaded());
        assert!(matches!(pool.get(0), Err(Error::Configuration { .. })));
        // Stays empty; no second load.
        pool.ensure_loaded().await;
        assert_eq!(pool.load_count(), 1);
    }

    #[tokio::test]
    async fn test_preloaded_pool_never_loads() {
        let pool = CredentialPool::from_credentials(["x", "y"]);
        assert!(pool.is_loaded());
        assert_eq!(pool.ensure_loaded().await, 2);
        assert_eq!(pool.load_count(), 0);
    }
}
