//! Cache manager.

use super::key::{CacheKey, KeyNormalizer};
use crate::error::SoftFailure;
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "content_cache";

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub collection: String,
    pub enabled: bool,
    pub max_entry_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            collection: "cached_artifacts".to_string(),
            enabled: true,
            max_entry_size: 1024 * 1024,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
    pub fn with_max_entry_size(mut self, bytes: usize) -> Self {
        self.max_entry_size = bytes;
        self
    }
}

/// Provenance stored next to every cached artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub created_at: DateTime<Utc>,
    pub original_topic: String,
    pub original_grade: String,
    pub original_language: String,
    pub usage_count: u64,
}

/// Stored document layout: `{ artifact, _metadata }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedArtifact<T> {
    pub artifact: T,
    #[serde(rename = "_metadata")]
    pub metadata: CacheMetadata,
}

/// Result of a successful [`ContentCache::store`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Written(CacheKey),
    /// The topic contained PII; nothing was written.
    SkippedPrivacy,
    Disabled,
    /// Serialized entry exceeded `max_entry_size`.
    TooLarge { bytes: usize },
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub privacy_skips: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    privacy_skips: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            privacy_skips: self.privacy_skips.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Privacy-aware content cache over a [`DocumentStore`].
///
/// Every failure is reported as a [`SoftFailure`] and must be treated as a miss by
/// the caller; the cache never fails a generation request.
pub struct ContentCache {
    config: CacheConfig,
    normalizer: KeyNormalizer,
    store: Arc<dyn DocumentStore>,
    stats: AtomicStats,
}

impl ContentCache {
    pub fn new(config: CacheConfig, normalizer: KeyNormalizer, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config,
            normalizer,
            store,
            stats: AtomicStats::default(),
        }
    }

    pub fn normalizer(&self) -> &KeyNormalizer {
        &self.normalizer
    }

    /// Looks up a cached artifact. `Ok(None)` is a miss, including PII topics.
    pub async fn lookup<T: DeserializeOwned>(
        &self,
        topic: &str,
        grade: &str,
        language: &str,
    ) -> Result<Option<T>, SoftFailure> {
        Ok(self
            .lookup_entry(topic, grade, language)
            .await?
            .map(|entry| entry.artifact))
    }

    /// Like [`ContentCache::lookup`], returning the stored metadata as well.
    pub async fn lookup_entry<T: DeserializeOwned>(
        &self,
        topic: &str,
        grade: &str,
        language: &str,
    ) -> Result<Option<CachedArtifact<T>>, SoftFailure> {
        if !self.config.enabled {
            return Ok(None);
        }
        let Some(key) = self.normalizer.cache_key(topic, grade, language) else {
            self.stats.privacy_skips.fetch_add(1, Ordering::Relaxed);
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let document = match self.store.get(&self.config.collection, key.as_str()).await {
            Ok(doc) => doc,
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, backend = self.store.name(), error = %e, "cache lookup failed; treating as miss");
                return Err(SoftFailure::new(COMPONENT, e.to_string()));
            }
        };

        let Some(document) = document else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "cache miss");
            return Ok(None);
        };

        match serde_json::from_value::<CachedArtifact<T>>(document) {
            Ok(entry) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                info!(key = %key, "cache hit");
                Ok(Some(entry))
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %e, "cached entry could not be decoded; treating as miss");
                Err(SoftFailure::new(COMPONENT, format!("undecodable entry {}: {}", key, e)))
            }
        }
    }

    /// Writes a freshly generated artifact. PII topics are never written.
    pub async fn store<T: Serialize>(
        &self,
        artifact: &T,
        topic: &str,
        grade: &str,
        language: &str,
    ) -> Result<StoreOutcome, SoftFailure> {
        if !self.config.enabled {
            return Ok(StoreOutcome::Disabled);
        }
        let Some(key) = self.normalizer.cache_key(topic, grade, language) else {
            self.stats.privacy_skips.fetch_add(1, Ordering::Relaxed);
            info!("skipping cache save for sensitive topic");
            return Ok(StoreOutcome::SkippedPrivacy);
        };

        let entry = CachedArtifact {
            artifact,
            metadata: CacheMetadata {
                created_at: Utc::now(),
                original_topic: topic.to_string(),
                original_grade: grade.to_string(),
                original_language: language.to_string(),
                usage_count: 1,
            },
        };
        let document = serde_json::to_value(&entry).map_err(|e| {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
            SoftFailure::new(COMPONENT, format!("artifact not serializable: {}", e))
        })?;

        let bytes = document.to_string().len();
        if bytes > self.config.max_entry_size {
            warn!(key = %key, bytes, limit = self.config.max_entry_size, "artifact too large to cache");
            return Ok(StoreOutcome::TooLarge { bytes });
        }

        match self
            .store
            .set(&self.config.collection, key.as_str(), document, false)
            .await
        {
            Ok(()) => {
                self.stats.writes.fetch_add(1, Ordering::Relaxed);
                info!(key = %key, "saved to cache");
                Ok(StoreOutcome::Written(key))
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, backend = self.store.name(), error = %e, "cache write failed");
                Err(SoftFailure::new(COMPONENT, e.to_string()))
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }
}
