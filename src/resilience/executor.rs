//! Resilient upstream call execution: credential rotation, bounded retry, backoff.

use super::policy::{Decision, RetryPolicy};
use crate::credentials::{Credential, CredentialPool};
use crate::error::UpstreamError;
use crate::{Error, ErrorContext, Result};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How the first credential of a call is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// Uniformly random start index, spreading load across keys.
    #[default]
    Random,
    /// Always start at this index (mod pool size).
    Fixed(usize),
}

/// Wraps one logical upstream invocation with credential rotation and retry.
///
/// Only rate-limit and auth rejections (429, 401, 403) are retried, each time with the
/// next credential in the pool. Anything else is returned as
/// [`Error::PermanentUpstream`] after a single call.
pub struct ResilientExecutor {
    pool: Arc<CredentialPool>,
    policy: RetryPolicy,
    deadline: Option<Duration>,
    rotation: Rotation,
}

impl ResilientExecutor {
    pub fn new(pool: Arc<CredentialPool>) -> Self {
        Self {
            pool,
            policy: RetryPolicy::default(),
            deadline: None,
            rotation: Rotation::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound on the whole call, backoff included.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = std::result::Result<T, UpstreamError>>,
    {
        self.execute_with_cancel(op, &CancellationToken::new()).await
    }

    /// Like [`ResilientExecutor::execute`]; cancelling `cancel` drops the in-flight
    /// call or backoff sleep and skips the remaining attempts.
    pub async fn execute_with_cancel<T, F, Fut>(&self, op: F, cancel: &CancellationToken) -> Result<T>
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = std::result::Result<T, UpstreamError>>,
    {
        let call_id = Uuid::new_v4().to_string();
        match self.deadline {
            None => self.run(op, cancel, &call_id).await,
            Some(deadline) => match tokio::time::timeout(deadline, self.run(op, cancel, &call_id)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(call_id = %call_id, deadline_ms = deadline.as_millis() as u64, "upstream call deadline exceeded");
                    Err(Error::Timeout {
                        elapsed_ms: deadline.as_millis() as u64,
                    })
                }
            },
        }
    }

    async fn run<T, F, Fut>(&self, mut op: F, cancel: &CancellationToken, call_id: &str) -> Result<T>
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = std::result::Result<T, UpstreamError>>,
    {
        let pool_size = self.pool.ensure_loaded().await;
        if pool_size == 0 {
            error!(call_id = %call_id, secret = self.pool.secret_name(), "no credentials available; not calling upstream");
            return Err(Error::configuration_with_context(
                "no usable API credentials configured",
                ErrorContext::new()
                    .with_field_path(self.pool.secret_name())
                    .with_source("resilient_executor"),
            ));
        }

        let max_attempts = self.policy.attempts_for(pool_size);
        let start_index = match self.rotation {
            Rotation::Random => rand::thread_rng().gen_range(0..pool_size),
            Rotation::Fixed(index) => index % pool_size,
        };

        let mut attempt: u32 = 0;
        loop {
            let key_index = (start_index + attempt as usize) % pool_size;
            let credential = self.pool.get(key_index)?;
            let fingerprint = credential.fingerprint();
            let started = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(call_id = %call_id, attempt = attempt + 1, "upstream call cancelled");
                    return Err(Error::Cancelled);
                }
                outcome = op(credential) => outcome,
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            let failure = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        info!(call_id = %call_id, key_index, key_fingerprint = %fingerprint, attempt = attempt + 1, duration_ms, "upstream call succeeded after rotation");
                    } else {
                        debug!(call_id = %call_id, key_index, duration_ms, "upstream call succeeded");
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let class = failure.class();
            warn!(
                call_id = %call_id,
                key_index,
                key_fingerprint = %fingerprint,
                attempt = attempt + 1,
                max_attempts,
                status = ?failure.effective_status(),
                class = %class,
                error = %failure.message,
                duration_ms,
                "upstream attempt failed"
            );

            match self.policy.decide(class, attempt, max_attempts) {
                Decision::Abort => {
                    return Err(Error::PermanentUpstream {
                        class,
                        source: failure,
                    });
                }
                Decision::Exhausted { delay } => {
                    backoff(delay, cancel, call_id).await?;
                    error!(call_id = %call_id, attempts = attempt + 1, class = %class, "all credential attempts failed");
                    return Err(Error::RetryableUpstream {
                        attempts: attempt + 1,
                        class,
                        source: failure,
                    });
                }
                Decision::Retry { delay } => {
                    info!(
                        call_id = %call_id,
                        delay_ms = delay.as_millis() as u64,
                        next_key_index = (start_index + attempt as usize + 1) % pool_size,
                        "rotating credential after backoff"
                    );
                    backoff(delay, cancel, call_id).await?;
                }
            }
            attempt += 1;
        }
    }
}

async fn backoff(delay: Duration, cancel: &CancellationToken, call_id: &str) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(call_id = %call_id, "cancelled during backoff");
            Err(Error::Cancelled)
        }
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn executor(keys: &[&str]) -> ResilientExecutor {
        ResilientExecutor::new(Arc::new(CredentialPool::from_credentials(keys.iter().copied())))
            .with_rotation(Rotation::Fixed(0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotates_through_credentials_in_order() {
        let exec = executor(&["k0", "k1", "k2"]).with_rotation(Rotation::Fixed(2));
        let seen = Mutex::new(Vec::new());
        let result: Result<()> = exec
            .execute(|cred| {
                seen.lock().unwrap().push(cred.expose().to_string());
                async { Err(UpstreamError::new("quota").with_status(429)) }
            })
            .await;
        assert!(matches!(result, Err(Error::RetryableUpstream { attempts: 3, .. })));
        assert_eq!(*seen.lock().unwrap(), vec!["k2", "k0", "k1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_key_pool_makes_one_attempt() {
        let exec = executor(&["only"]);
        let calls = AtomicU32::new(0);
        let result: Result<()> = exec
            .execute(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(UpstreamError::new("denied").with_status(403)) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(Error::RetryableUpstream { attempts: 1, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_whole_call() {
        let exec = executor(&["a", "b", "c"]).with_deadline(Duration::from_millis(1500));
        let result: Result<()> = exec
            .execute(|_| async { Err(UpstreamError::new("429 Too Many Requests")) })
            .await;
        assert!(matches!(result, Err(Error::Timeout { elapsed_ms: 1500 })));
    }
}
