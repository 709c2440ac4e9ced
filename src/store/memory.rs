use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

use async_trait::async_trait;

use super::{ObjectStore, StoreError};

/// In-memory object store.
///
/// Objects live in a `BTreeMap` so listing order is lexical by key, the
/// same as the common remote-store case. Primarily intended for tests: it
/// counts fetches (to assert that synchronisation never re-downloads a
/// known message) and can be told to fail fetching specific keys (to
/// exercise the abort-and-resume path).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an object.
    pub fn insert(&self, key: &str, content: &[u8]) {
        self.objects
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), content.to_vec());
    }

    /// Remove an object from the remote listing.
    pub fn remove(&self, key: &str) {
        self.objects
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
    }

    /// Make subsequent fetches of `key` fail until [`Self::heal`] is called.
    pub fn fail_fetch(&self, key: &str) {
        self.failing
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string());
    }

    /// Clear all injected fetch failures.
    pub fn heal(&self) {
        self.failing
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    /// How many fetches have been issued (successful or not).
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let wanted = format!("{prefix}/");

        Ok(self
            .objects
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .filter(|key| key.starts_with(&wanted))
            .cloned()
            .collect())
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self
            .failing
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(key)
        {
            return Err(StoreError::Internal(format!("injected failure for {key}")));
        }

        self.objects
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
