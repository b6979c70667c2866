//! In-process document store.

use super::{merge_documents, Document, DocumentStore, Mutation, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Collections = HashMap<String, HashMap<String, Document>>;

/// Shared in-memory store.
///
/// Clones share the same underlying map, so one instance can back both the
/// content cache and the rate limiter.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.read()
            .map(|c| c.get(collection).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Removes every document of `collection`.
    pub fn purge(&self, collection: &str) -> Result<usize, StoreError> {
        let mut collections = self.write()?;
        Ok(collections.remove(collection).map_or(0, |c| c.len()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.collections
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, StoreError> {
        self.collections
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        document: Document,
        merge: bool,
    ) -> Result<(), StoreError> {
        let mut collections = self.write()?;
        let docs = collections.entry(collection.to_string()).or_default();
        let next = if merge {
            merge_documents(docs.remove(key), document)
        } else {
            document
        };
        docs.insert(key.to_string(), next);
        Ok(())
    }

    async fn update<'m>(
        &self,
        collection: &str,
        key: &str,
        mutation: Mutation<'m>,
    ) -> Result<(), StoreError> {
        let mut collections = self.write()?;
        let docs = collections.entry(collection.to_string()).or_default();
        if let Some(next) = mutation(docs.get(key)) {
            let merged = merge_documents(docs.remove(key), next);
            docs.insert(key.to_string(), merged);
        }
        Ok(())
    }

    fn atomic_updates(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
