//! 弹性模块：凭证轮换重试执行器与滑动窗口限流器。
//!
//! # Resilience Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResilientExecutor`] | Credential rotation with bounded retry and exponential backoff |
//! | [`RetryPolicy`] | Attempt cap and backoff schedule |
//! | [`SlidingWindowLimiter`] | Per-identity request quota over a trailing window |
//!
//! ## Resilient execution
//!
//! ```rust,no_run
//! use gen_guard::credentials::CredentialPool;
//! use gen_guard::error::UpstreamError;
//! use gen_guard::resilience::ResilientExecutor;
//! use std::sync::Arc;
//!
//! # async fn run() -> gen_guard::Result<()> {
//! let pool = Arc::new(CredentialPool::from_credentials(["key-a", "key-b", "key-c"]));
//! let executor = ResilientExecutor::new(pool);
//!
//! let text = executor
//!     .execute(|credential| async move {
//!         // call the model with credential.expose()
//!         if credential.expose().is_empty() {
//!             return Err(UpstreamError::new("quota exhausted").with_status(429));
//!         }
//!         Ok("lesson plan".to_string())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Rate limiting
//!
//! ```rust
//! use gen_guard::resilience::{Admission, RateLimitConfig, SlidingWindowLimiter};
//! use gen_guard::store::MemoryStore;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let limiter = SlidingWindowLimiter::new(Arc::new(MemoryStore::new()), RateLimitConfig::default());
//! let admission = limiter.check("teacher-42").await.unwrap();
//! assert_eq!(admission, Admission::Allowed { remaining: 4 });
//! # });
//! ```

pub mod executor;
mod policy;
pub mod rate_limiter;

pub use executor::{ResilientExecutor, Rotation};
pub use policy::RetryPolicy;
pub use rate_limiter::{Admission, RateLimitConfig, SlidingWindowLimiter};
