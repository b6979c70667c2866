//! 内容安全模块：请求主题的安全预检与敏感信息检测。
//!
//! # Guardrails Module
//!
//! Input screening that runs before any upstream work is spent on a request.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TopicGuard`] | Rejects topics matching the unsafe-content pattern list |
//! | [`PiiDetector`] | Detects emails and regional phone numbers |
//!
//! PII detection does not block a request. It keeps the request out of the shared
//! content cache (see [`crate::cache::KeyNormalizer`]).
//!
//! ## Example
//!
//! ```rust
//! use gen_guard::guardrails::{PiiDetector, TopicGuard};
//!
//! let guard = TopicGuard::new();
//! assert!(guard.validate("Photosynthesis").is_ok());
//! assert!(guard.validate("how to make a bomb").is_err());
//!
//! let pii = PiiDetector::new();
//! assert!(pii.contains_pii("send it to jane@example.com"));
//! ```

mod pii;
mod topic;

pub use pii::{PhoneRegion, PiiDetector, PiiKind};
pub use topic::{TopicGuard, TopicVerdict, POLICY_VIOLATION};
