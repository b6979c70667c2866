//! # gen-guard
//!
//! 生成式 AI 调用的防护层：凭证轮换重试、隐私感知的内容缓存与滑动窗口限流。
//!
//! Guard layer for generative AI calls: credential rotation with bounded retry,
//! a privacy-aware content cache, and per-identity sliding-window throttling.
//!
//! ## Overview
//!
//! Every generation feature funnels through this layer before and after calling the
//! upstream model. The model call itself is an opaque closure supplied by the caller;
//! this crate only decides which credential it gets, whether it is retried, whether it
//! runs at all, and whether its result is reused.
//!
//! ## Key Features
//!
//! - **Credential rotation**: [`credentials::CredentialPool`] loads keys once;
//!   [`resilience::ResilientExecutor`] rotates through them on 429/401/403
//! - **Content cache**: [`cache::ContentCache`] keyed by normalized
//!   `(topic, grade, language)`; topics containing PII are never cached
//! - **Rate limiting**: [`resilience::SlidingWindowLimiter`] per user id
//! - **Fail-open storage**: store faults come back as [`error::SoftFailure`] values
//!
//! ## Quick Start
//!
//! ```rust
//! use gen_guard::credentials::CredentialPool;
//! use gen_guard::error::UpstreamError;
//! use gen_guard::resilience::ResilientExecutor;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let pool = Arc::new(CredentialPool::from_credentials(["key-a", "key-b"]));
//! let executor = ResilientExecutor::new(pool);
//! let answer: gen_guard::Result<String> = executor
//!     .execute(|_credential| async { Ok::<_, UpstreamError>("42".to_string()) })
//!     .await;
//! assert_eq!(answer.unwrap(), "42");
//! # });
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`credentials`] | Credential pool and secret sources |
//! | [`resilience`] | Resilient executor, retry policy, rate limiter |
//! | [`cache`] | Key normalizer and content cache |
//! | [`guardrails`] | Topic safety screen and PII detection |
//! | [`store`] | Document store abstraction and in-memory store |
//! | [`service`] | End-to-end generation orchestration |
//! | [`config`] | Environment configuration |
//! | [`error_code`] | Upstream failure classification |

pub mod cache;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error_code;
pub mod guardrails;
pub mod resilience;
pub mod service;
pub mod store;

pub use cache::{CacheKey, ContentCache, KeyNormalizer};
pub use config::GuardConfig;
pub use credentials::{Credential, CredentialPool};
pub use error_code::FailureClass;
pub use resilience::{Admission, ResilientExecutor, SlidingWindowLimiter};
pub use service::{GenerationRequest, GenerationService};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, SoftFailure, UpstreamError};
