//! 文档存储抽象：缓存条目与限流窗口共用的持久化键值接口。
//!
//! # Document Store Module
//!
//! Content cache entries and rate-limit windows live in an external, shared
//! document store. This module defines the contract the rest of the crate relies
//! on and ships an in-process implementation.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`DocumentStore`] | Trait for collection/key addressed JSON documents |
//! | [`MemoryStore`] | In-process store with atomic read-modify-write |
//! | [`StoreError`] | Failures reported by store implementations |
//!
//! ## Read-modify-write
//!
//! [`DocumentStore::update`] hands the current document to a mutation and writes
//! back whatever it returns. The provided default runs `get` then `set` with no
//! isolation, so two concurrent updates of one key may both observe the old state.
//! Backends with transactions or conditional writes should override it;
//! [`MemoryStore`] does so under its write lock.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// A JSON document.
pub type Document = serde_json::Value;

/// Mutation applied by [`DocumentStore::update`].
///
/// Receives the current document (if any). Returning `Some` replaces it, `None`
/// leaves the store untouched.
pub type Mutation<'m> = Box<dyn FnOnce(Option<&Document>) -> Option<Document> + Send + 'm>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{operation} failed for {collection}/{key}: {message}")]
    Operation {
        operation: &'static str,
        collection: String,
        key: String,
        message: String,
    },

    #[error("document encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError>;

    /// Writes `document`. With `merge`, top-level fields of an existing object
    /// document are kept unless overwritten.
    async fn set(
        &self,
        collection: &str,
        key: &str,
        document: Document,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Read-modify-write of a single document. Not isolated by default.
    async fn update<'m>(
        &self,
        collection: &str,
        key: &str,
        mutation: Mutation<'m>,
    ) -> Result<(), StoreError> {
        let current = self.get(collection, key).await?;
        if let Some(next) = mutation(current.as_ref()) {
            self.set(collection, key, next, true).await?;
        }
        Ok(())
    }

    /// Whether [`DocumentStore::update`] is isolated against concurrent writers.
    fn atomic_updates(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str;
}

/// Applies Firestore-style merge semantics.
pub(crate) fn merge_documents(existing: Option<Document>, incoming: Document) -> Document {
    match (existing, incoming) {
        (Some(Document::Object(mut base)), Document::Object(fields)) => {
            base.extend(fields);
            Document::Object(base)
        }
        (_, incoming) => incoming,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let merged = merge_documents(Some(json!({"a": 1, "b": 2})), json!({"b": 3, "c": 4}));
        assert_eq!(merged, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_merge_replaces_non_objects() {
        assert_eq!(merge_documents(Some(json!([1, 2])), json!({"a": 1})), json!({"a": 1}));
        assert_eq!(merge_documents(None, json!("x")), json!("x"));
    }
}
