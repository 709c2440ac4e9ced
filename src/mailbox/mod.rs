pub mod index;
pub mod metadata;
pub mod snapshot;
pub mod sync;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use index::{Index, IndexEntry};
pub use metadata::MessageMetadata;
pub use snapshot::{DeletionSet, Snapshot};
pub use sync::sync;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum MailboxError {
    /// Local filesystem failure (mailbox directory, message files, ledger)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A metadata sidecar could not be serialized or parsed
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// The remote listing or an object fetch failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The user (or a remote object) maps to an unsafe local name
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// An already-indexed remote id was appended a second time
    #[error("remote id already indexed: {0}")]
    DuplicateRemoteId(String),
}

/// One user's local mailbox: a directory under the mail root holding the
/// downloaded message files, their `.json` metadata sidecars and the
/// append-only index ledger.
#[derive(Debug, Clone)]
pub struct Mailbox {
    user: String,
    dir: PathBuf,
}

impl Mailbox {
    /// Open (creating if necessary) the local mailbox for `user`.
    ///
    /// # Errors
    ///
    /// If the user name would escape the mail root, or the directory
    /// cannot be created.
    pub async fn open(mail_root: &Path, user: &str) -> Result<Self, MailboxError> {
        validate_name(user)?;

        let dir = mail_root.join(user);
        tokio::fs::create_dir_all(&dir).await?;

        Ok(Self {
            user: user.to_string(),
            dir,
        })
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a downloaded message's content file.
    #[must_use]
    pub fn message_path(&self, remote_id: &str) -> PathBuf {
        self.dir.join(remote_id)
    }

    /// Read a downloaded message back, lossily decoded to text. Messages
    /// are handled line-wise throughout, so the decoding only matters for
    /// byte sequences that were never valid in the first place.
    pub async fn read_message(&self, remote_id: &str) -> Result<String, MailboxError> {
        let raw = tokio::fs::read(self.message_path(remote_id)).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Remove a message's content file and its metadata sidecar.
    pub async fn remove_message(&self, remote_id: &str) -> Result<(), MailboxError> {
        tokio::fs::remove_file(metadata::sidecar_path(&self.dir, remote_id)).await?;
        tokio::fs::remove_file(self.message_path(remote_id)).await?;
        Ok(())
    }
}

/// Reject names that would resolve outside the mailbox directory. The
/// index ledger's name and the metadata sidecar suffix are reserved as
/// well: a remote id ending in the sidecar suffix would make its content
/// file indistinguishable from another message's metadata.
pub(crate) fn validate_name(name: &str) -> Result<(), MailboxError> {
    let unsafe_name = name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.ends_with(metadata::SIDECAR_SUFFIX)
        || name == index::INDEX_FILE;

    if unsafe_name {
        return Err(MailboxError::InvalidName(name.to_string()));
    }

    Ok(())
}
