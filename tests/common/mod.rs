//! Shared fakes for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use gen_guard::credentials::{Credential, SecretError, SecretSource};
use gen_guard::store::{Document, DocumentStore, MemoryStore, Mutation, StoreError};
use gen_guard::UpstreamError;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// MemoryStore that counts every call.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub updates: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(collection, key).await
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        document: Document,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(collection, key, document, merge).await
    }

    async fn update<'m>(
        &self,
        collection: &str,
        key: &str,
        mutation: Mutation<'m>,
    ) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(collection, key, mutation).await
    }

    fn atomic_updates(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Store whose backend is always down.
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get(&self, _collection: &str, _key: &str) -> Result<Option<Document>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn set(
        &self,
        _collection: &str,
        _key: &str,
        _document: Document,
        _merge: bool,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Upstream that replays scripted responses and records which keys it saw.
///
/// Once the script runs out every call succeeds with `"ok"`.
pub struct ScriptedUpstream {
    responses: Mutex<VecDeque<Result<String, UpstreamError>>>,
    seen: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedUpstream {
    pub fn new(responses: Vec<Result<String, UpstreamError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(failure: UpstreamError, times: usize) -> Self {
        Self::new((0..times).map(|_| Err(failure.clone())).collect())
    }

    pub fn call(&self, credential: Credential) -> impl Future<Output = Result<String, UpstreamError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(credential.expose().to_string());
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()));
        async move { next }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

/// Secret source that is slow and counts fetches.
pub struct SlowSecretSource {
    pub value: String,
    pub delay: Duration,
    pub fetches: AtomicUsize,
}

impl SlowSecretSource {
    pub fn new(value: &str, delay: Duration) -> Self {
        Self {
            value: value.to_string(),
            delay,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SecretSource for SlowSecretSource {
    async fn fetch_secret(&self, _name: &str) -> Result<String, SecretError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.value.clone())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

pub fn rate_limited(message: &str) -> UpstreamError {
    UpstreamError::new(message).with_status(429)
}
