//! 凭证池模块：从密钥源一次性加载并轮换上游 API 凭证。
//!
//! # Credentials Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CredentialPool`] | Ordered, lazily loaded set of interchangeable API keys |
//! | [`SecretSource`] | Where the comma-separated key string comes from |
//! | [`KeyringSecretSource`] | OS keyring entry |
//! | [`EnvSecretSource`] | Environment variable |
//! | [`Credential`] | A single key; prints only its fingerprint |
//!
//! Loading order: the configured secret source first, then the local fallback value.
//! Placeholder entries (`secrets/...`) are dropped in both cases.
//!
//! ```rust
//! use gen_guard::credentials::{CredentialConfig, CredentialPool, StaticSecretSource};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let pool = CredentialPool::new(
//!     Arc::new(StaticSecretSource::new("key-a, key-b, secrets/UNRESOLVED")),
//!     CredentialConfig::default(),
//! );
//! assert_eq!(pool.ensure_loaded().await, 2);
//! println!("{}", pool.get(0).unwrap()); // key#<fingerprint>
//! # });
//! ```

mod pool;
mod secret;

pub use pool::{
    parse_credentials, Credential, CredentialConfig, CredentialPool, DEFAULT_PLACEHOLDER_PREFIX,
    DEFAULT_SECRET_NAME,
};
pub use secret::{EnvSecretSource, KeyringSecretSource, SecretError, SecretSource, StaticSecretSource};
