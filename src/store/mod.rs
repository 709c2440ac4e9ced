pub mod fs;
pub mod memory;

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fs::FsStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure talking to the backing store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested object does not exist
    #[error("no such object: {0}")]
    NotFound(String),

    /// Anything else (lock poisoning, injected test failures, ...)
    #[error("store error: {0}")]
    Internal(String),
}

/// The external object store the mailboxes live in.
///
/// Keys are flat strings; a user's messages all share that user's prefix
/// (`<user>/<object>`). The store is read-only from the gateway's point of
/// view: deletion applies to the local mailbox only.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object key under the given prefix, in the store's own
    /// listing order (lexical by key for both provided backends).
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Fetch the full content of one object by key.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Which [`ObjectStore`] implementation to run against, as configured.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// A directory tree: `<root>/<user>/<object>`
    Fs { root: PathBuf },
    /// In-memory store, mainly for testing and local experiments
    Memory,
}

impl StoreConfig {
    #[must_use]
    pub fn build(&self) -> Arc<dyn ObjectStore> {
        match self {
            Self::Fs { root } => Arc::new(FsStore::new(root.clone())),
            Self::Memory => Arc::new(MemoryStore::new()),
        }
    }
}
