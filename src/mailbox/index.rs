use std::{collections::HashSet, path::Path};

use tokio::io::AsyncWriteExt;

use super::MailboxError;

/// Name of the ledger file inside a mailbox directory.
pub(crate) const INDEX_FILE: &str = "_index";

/// One permanently assigned message identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub remote_id: String,
    pub sequence_id: u32,
}

/// The append-only ledger mapping remote object ids to permanent sequence
/// identifiers.
///
/// On disk it is one remote id per line; a line's 1-based position is its
/// sequence id. The ledger is never rewritten and never shrinks, even
/// after the message itself is deleted, so an id observed once stays
/// valid across restarts and is never reassigned.
#[derive(Debug, Default)]
pub struct Index {
    entries: Vec<IndexEntry>,
    known: HashSet<String>,
}

impl Index {
    /// Load the ledger from a mailbox directory. A missing or unreadable
    /// ledger is an empty index, not an error: the first run starts with
    /// zero entries.
    pub async fn load(dir: &Path) -> Self {
        let Ok(raw) = tokio::fs::read_to_string(dir.join(INDEX_FILE)).await else {
            return Self::default();
        };

        let mut index = Self::default();
        for line in raw.lines() {
            if line.is_empty() {
                continue;
            }

            let sequence_id = index.next_sequence_id();
            index.known.insert(line.to_string());
            index.entries.push(IndexEntry {
                remote_id: line.to_string(),
                sequence_id,
            });
        }

        index
    }

    #[must_use]
    pub fn contains(&self, remote_id: &str) -> bool {
        self.known.contains(remote_id)
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The id the next appended entry will receive: one past the highest
    /// id ever assigned, starting at 1.
    #[must_use]
    pub fn next_sequence_id(&self) -> u32 {
        self.entries
            .iter()
            .map(|entry| entry.sequence_id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Record a newly observed remote id, durably and in memory.
    ///
    /// # Errors
    ///
    /// If the id is already indexed (callers check [`Self::contains`]
    /// first) or the ledger file cannot be appended to.
    pub async fn append(
        &mut self,
        dir: &Path,
        remote_id: &str,
    ) -> Result<IndexEntry, MailboxError> {
        if self.contains(remote_id) {
            return Err(MailboxError::DuplicateRemoteId(remote_id.to_string()));
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(INDEX_FILE))
            .await?;
        file.write_all(format!("{remote_id}\n").as_bytes()).await?;
        file.flush().await?;

        let entry = IndexEntry {
            remote_id: remote_id.to_string(),
            sequence_id: self.next_sequence_id(),
        };
        self.known.insert(remote_id.to_string());
        self.entries.push(entry.clone());

        Ok(entry)
    }
}
