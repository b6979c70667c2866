//! 内容缓存模块：基于规范化键的生成结果缓存，含隐私保护。
//!
//! # Content Caching Module
//!
//! Stores generated artifacts under a normalized `(topic, grade, language)` key so
//! that paraphrased requests reuse a previous generation instead of calling the model
//! again.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`KeyNormalizer`] | Derives deterministic keys; refuses topics containing PII |
//! | [`ContentCache`] | Lookup / write-back over a [`crate::store::DocumentStore`] |
//! | [`CacheConfig`] | Collection name, enable flag and entry size limit |
//! | [`CacheStats`] | Hit, miss and privacy-skip counters |
//!
//! ## Example
//!
//! ```rust
//! use gen_guard::cache::KeyNormalizer;
//!
//! let normalizer = KeyNormalizer::default();
//! let a = normalizer.cache_key("Teach me about Gravity", "Class 5", "English");
//! let b = normalizer.cache_key("  gravity ", "class 5", "ENGLISH");
//! assert_eq!(a, b);
//!
//! // Topics containing PII never get a key.
//! assert!(normalizer.cache_key("mail jane@example.com", "Class 5", "English").is_none());
//! ```
//!
//! Cache failures never fail a request: every operation returns
//! [`crate::error::SoftFailure`] instead of [`crate::Error`], and callers treat it as a
//! miss.

mod key;
mod manager;

pub use key::{CacheKey, KeyNormalizer, NormalizerConfig, DEFAULT_STOP_WORDS};
pub use manager::{CacheConfig, CacheMetadata, CacheStats, CachedArtifact, ContentCache, StoreOutcome};
