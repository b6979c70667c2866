//! Environment-driven configuration.

use crate::cache::{CacheConfig, NormalizerConfig};
use crate::credentials::{CredentialConfig, DEFAULT_SECRET_NAME};
use crate::guardrails::PhoneRegion;
use crate::resilience::{RateLimitConfig, RetryPolicy};
use crate::{Error, ErrorContext, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_SECRET_NAME: &str = "GEN_GUARD_SECRET_NAME";
pub const ENV_KEYRING_SERVICE: &str = "GEN_GUARD_KEYRING_SERVICE";
pub const ENV_MAX_ATTEMPTS: &str = "GEN_GUARD_MAX_ATTEMPTS";
pub const ENV_BACKOFF_BASE_MS: &str = "GEN_GUARD_BACKOFF_BASE_MS";
pub const ENV_DEADLINE_MS: &str = "GEN_GUARD_DEADLINE_MS";
pub const ENV_RATE_WINDOW_SECS: &str = "GEN_GUARD_RATE_WINDOW_SECS";
pub const ENV_RATE_MAX_REQUESTS: &str = "GEN_GUARD_RATE_MAX_REQUESTS";
pub const ENV_CACHE_ENABLED: &str = "GEN_GUARD_CACHE_ENABLED";
pub const ENV_CACHE_COLLECTION: &str = "GEN_GUARD_CACHE_COLLECTION";
pub const ENV_STRIP_STOP_WORDS: &str = "GEN_GUARD_STRIP_STOP_WORDS";
pub const ENV_PHONE_REGION: &str = "GEN_GUARD_PHONE_REGION";

pub const DEFAULT_KEYRING_SERVICE: &str = "gen-guard";

/// Every knob of the guard layer.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub credentials: CredentialConfig,
    pub keyring_service: String,
    pub retry: RetryPolicy,
    pub deadline: Option<Duration>,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub normalizer: NormalizerConfig,
    pub phone_region: PhoneRegion,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            credentials: CredentialConfig::default(),
            keyring_service: DEFAULT_KEYRING_SERVICE.to_string(),
            retry: RetryPolicy::default(),
            deadline: None,
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            normalizer: NormalizerConfig::default(),
            phone_region: PhoneRegion::default(),
        }
    }
}

impl GuardConfig {
    /// Reads `GEN_GUARD_*` variables from the process environment.
    ///
    /// The local credential fallback is the variable named by the secret name
    /// (`GOOGLE_GENAI_API_KEY` unless overridden).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        let secret_name = get(ENV_SECRET_NAME).unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string());
        config.credentials = CredentialConfig::new(secret_name.clone());
        if let Some(raw) = lookup(&secret_name) {
            config.credentials = config.credentials.with_local_fallback(raw);
        }
        if let Some(service) = get(ENV_KEYRING_SERVICE) {
            config.keyring_service = service;
        }

        if let Some(attempts) = parse_var::<u32>(ENV_MAX_ATTEMPTS, get(ENV_MAX_ATTEMPTS))? {
            if attempts == 0 {
                return Err(invalid(ENV_MAX_ATTEMPTS, "must be at least 1"));
            }
            config.retry = config.retry.with_max_attempts(attempts);
        }
        if let Some(ms) = parse_var::<u64>(ENV_BACKOFF_BASE_MS, get(ENV_BACKOFF_BASE_MS))? {
            config.retry = config.retry.with_base_delay(Duration::from_millis(ms));
        }
        config.deadline = parse_var::<u64>(ENV_DEADLINE_MS, get(ENV_DEADLINE_MS))?
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        if let Some(secs) = parse_var::<u64>(ENV_RATE_WINDOW_SECS, get(ENV_RATE_WINDOW_SECS))? {
            if secs == 0 {
                return Err(invalid(ENV_RATE_WINDOW_SECS, "must be positive"));
            }
            config.rate_limit = config.rate_limit.with_window(Duration::from_secs(secs));
        }
        if let Some(max) = parse_var::<u32>(ENV_RATE_MAX_REQUESTS, get(ENV_RATE_MAX_REQUESTS))? {
            config.rate_limit = config.rate_limit.with_max_requests(max);
        }

        if let Some(enabled) = parse_flag(ENV_CACHE_ENABLED, get(ENV_CACHE_ENABLED))? {
            config.cache = config.cache.with_enabled(enabled);
        }
        if let Some(collection) = get(ENV_CACHE_COLLECTION) {
            config.cache = config.cache.with_collection(collection);
        }
        if let Some(strip) = parse_flag(ENV_STRIP_STOP_WORDS, get(ENV_STRIP_STOP_WORDS))? {
            config.normalizer = config.normalizer.with_strip_stop_words(strip);
        }
        if let Some(region) = get(ENV_PHONE_REGION) {
            config.phone_region = region
                .parse::<PhoneRegion>()
                .map_err(|e| invalid(ENV_PHONE_REGION, e))?;
        }

        Ok(config)
    }
}

fn parse_var<T>(key: &str, raw: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| v.parse::<T>().map_err(|e| invalid(key, format!("'{}': {}", v, e))))
        .transpose()
}

fn parse_flag(key: &str, raw: Option<String>) -> Result<Option<bool>> {
    raw.map(|v| match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, format!("'{}' is not a boolean", v))),
    })
    .transpose()
}

fn invalid(key: &str, details: impl Into<String>) -> Error {
    Error::configuration_with_context(
        "invalid configuration value",
        ErrorContext::new()
            .with_field_path(key)
            .with_details(details)
            .with_source("guard_config"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<GuardConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GuardConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.credentials.secret_name, "GOOGLE_GENAI_API_KEY");
        assert!(cfg.credentials.local_fallback.is_none());
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.base_delay, Duration::from_millis(1000));
        assert_eq!(cfg.rate_limit.window, Duration::from_secs(600));
        assert_eq!(cfg.rate_limit.max_requests, 5);
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.collection, "cached_artifacts");
        assert!(cfg.deadline.is_none());
        assert_eq!(cfg.phone_region, PhoneRegion::India);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("GEN_GUARD_SECRET_NAME", "MY_KEYS"),
            ("MY_KEYS", "a,b"),
            ("GEN_GUARD_MAX_ATTEMPTS", "2"),
            ("GEN_GUARD_DEADLINE_MS", "20000"),
            ("GEN_GUARD_RATE_MAX_REQUESTS", "0"),
            ("GEN_GUARD_CACHE_ENABLED", "false"),
            ("GEN_GUARD_STRIP_STOP_WORDS", "0"),
            ("GEN_GUARD_PHONE_REGION", "us"),
        ])
        .unwrap();
        assert_eq!(cfg.credentials.secret_name, "MY_KEYS");
        assert_eq!(cfg.credentials.local_fallback.as_deref(), Some("a,b"));
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(cfg.deadline, Some(Duration::from_secs(20)));
        assert_eq!(cfg.rate_limit.max_requests, 0);
        assert!(!cfg.cache.enabled);
        assert!(!cfg.normalizer.strip_stop_words);
        assert_eq!(cfg.phone_region, PhoneRegion::NorthAmerica);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = config(&[("GEN_GUARD_MAX_ATTEMPTS", "three")]).unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("GEN_GUARD_MAX_ATTEMPTS")
        );
        assert!(config(&[("GEN_GUARD_CACHE_ENABLED", "maybe")]).is_err());
        assert!(config(&[("GEN_GUARD_MAX_ATTEMPTS", "0")]).is_err());
        assert!(config(&[("GEN_GUARD_PHONE_REGION", "mars")]).is_err());
    }
}
