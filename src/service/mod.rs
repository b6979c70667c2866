//! 生成编排模块：安全检查、限流、缓存查询、弹性调用与缓存回写的串联。
//!
//! # Generation Service
//!
//! [`GenerationService`] runs one generation request through the guard layer:
//!
//! 1. canonicalize the request ([`GenerationRequest::canonicalized`])
//! 2. topic safety pre-scan ([`crate::guardrails::TopicGuard`])
//! 3. rate limit check for the caller identity
//! 4. content cache lookup; a hit returns immediately
//! 5. resilient upstream execution with credential rotation
//! 6. cache write-back of the fresh artifact
//!
//! Steps 3, 4 and 6 fail open.
//!
//! ```rust,no_run
//! use gen_guard::config::GuardConfig;
//! use gen_guard::credentials::EnvSecretSource;
//! use gen_guard::service::{GenerationRequest, GenerationService};
//! use gen_guard::store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> gen_guard::Result<()> {
//! let config = GuardConfig::from_env()?;
//! let service = GenerationService::from_config(
//!     &config,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(EnvSecretSource),
//! );
//!
//! let request = GenerationRequest::new("Photosynthesis", "5", "en").with_user("teacher-7");
//! let generated = service
//!     .generate(&request, |_credential| async { Ok(serde_json::json!({"title": "Photosynthesis"})) })
//!     .await?;
//! println!("from cache: {}", generated.is_cached());
//! # Ok(())
//! # }
//! ```

mod request;

pub use request::{GenerationRequest, ANONYMOUS_USER};

use crate::cache::{ContentCache, KeyNormalizer, StoreOutcome};
use crate::config::GuardConfig;
use crate::credentials::{Credential, CredentialPool, SecretSource};
use crate::error::UpstreamError;
use crate::guardrails::{PiiDetector, TopicGuard};
use crate::resilience::{Admission, ResilientExecutor, SlidingWindowLimiter};
use crate::store::DocumentStore;
use crate::{Error, ErrorContext, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where a generated artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Fresh,
}

#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub artifact: T,
    pub origin: Origin,
}

impl<T> Generated<T> {
    pub fn is_cached(&self) -> bool {
        self.origin == Origin::Cache
    }

    pub fn into_inner(self) -> T {
        self.artifact
    }
}

pub struct GenerationService {
    guard: TopicGuard,
    limiter: Option<SlidingWindowLimiter>,
    cache: Option<ContentCache>,
    executor: ResilientExecutor,
    limit_anonymous: bool,
}

impl GenerationService {
    pub fn builder() -> GenerationServiceBuilder {
        GenerationServiceBuilder::new()
    }

    /// Wires every component from `config`, sharing one store for cache and limits.
    pub fn from_config(
        config: &GuardConfig,
        store: Arc<dyn DocumentStore>,
        secrets: Arc<dyn SecretSource>,
    ) -> Self {
        let pool = Arc::new(CredentialPool::new(secrets, config.credentials.clone()));
        let mut executor = ResilientExecutor::new(pool).with_policy(config.retry.clone());
        if let Some(deadline) = config.deadline {
            executor = executor.with_deadline(deadline);
        }
        let normalizer = KeyNormalizer::new(config.normalizer.clone())
            .with_pii_detector(PiiDetector::new().with_region(config.phone_region));

        Self {
            guard: TopicGuard::new(),
            limiter: Some(SlidingWindowLimiter::new(store.clone(), config.rate_limit.clone())),
            cache: Some(ContentCache::new(config.cache.clone(), normalizer, store)),
            executor,
            limit_anonymous: false,
        }
    }

    pub fn cache(&self) -> Option<&ContentCache> {
        self.cache.as_ref()
    }

    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    pub async fn generate<T, F, Fut>(&self, request: &GenerationRequest, op: F) -> Result<Generated<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = std::result::Result<T, UpstreamError>>,
    {
        self.generate_with_cancel(request, op, &CancellationToken::new())
            .await
    }

    pub async fn generate_with_cancel<T, F, Fut>(
        &self,
        request: &GenerationRequest,
        op: F,
        cancel: &CancellationToken,
    ) -> Result<Generated<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = std::result::Result<T, UpstreamError>>,
    {
        let request = request.canonicalized();
        self.guard.validate(&request.topic)?;

        if let Some(limiter) = &self.limiter {
            if self.limit_anonymous || !request.is_anonymous() {
                if let Admission::FailedOpen(failure) = limiter.check(request.identity()).await? {
                    debug!(failure = %failure, "proceeding without rate limit");
                }
            }
        }

        if let Some(cache) = &self.cache {
            match cache
                .lookup::<T>(&request.topic, &request.grade, &request.language)
                .await
            {
                Ok(Some(artifact)) => {
                    return Ok(Generated {
                        artifact,
                        origin: Origin::Cache,
                    })
                }
                Ok(None) => {}
                Err(failure) => debug!(failure = %failure, "cache lookup failed; generating fresh"),
            }
        }

        let artifact = self.executor.execute_with_cancel(op, cancel).await?;

        if let Some(cache) = &self.cache {
            match cache
                .store(&artifact, &request.topic, &request.grade, &request.language)
                .await
            {
                Ok(StoreOutcome::Written(key)) => debug!(key = %key, "artifact cached"),
                Ok(outcome) => debug!(outcome = ?outcome, "artifact not cached"),
                Err(failure) => warn!(failure = %failure, "cache write-back failed"),
            }
        }

        info!(identity = request.identity(), "generated fresh artifact");
        Ok(Generated {
            artifact,
            origin: Origin::Fresh,
        })
    }
}

/// Builder for [`GenerationService`].
pub struct GenerationServiceBuilder {
    guard: TopicGuard,
    limiter: Option<SlidingWindowLimiter>,
    cache: Option<ContentCache>,
    executor: Option<ResilientExecutor>,
    limit_anonymous: bool,
}

impl GenerationServiceBuilder {
    pub fn new() -> Self {
        Self {
            guard: TopicGuard::new(),
            limiter: None,
            cache: None,
            executor: None,
            limit_anonymous: false,
        }
    }

    pub fn with_executor(mut self, executor: ResilientExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_topic_guard(mut self, guard: TopicGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: SlidingWindowLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_cache(mut self, cache: ContentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Also rate-limit requests without a user id (they share one window). Off by default.
    pub fn limit_anonymous(mut self, enable: bool) -> Self {
        self.limit_anonymous = enable;
        self
    }

    pub fn build(self) -> Result<GenerationService> {
        let executor = self.executor.ok_or_else(|| {
            Error::configuration_with_context(
                "generation service needs an executor",
                ErrorContext::new().with_source("generation_service_builder"),
            )
        })?;
        Ok(GenerationService {
            guard: self.guard,
            limiter: self.limiter,
            cache: self.cache,
            executor,
            limit_anonymous: self.limit_anonymous,
        })
    }
}

impl Default for GenerationServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
