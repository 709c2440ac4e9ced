use std::collections::HashSet;

use super::{Mailbox, MailboxError, MessageMetadata};

/// The frozen, 1-indexed view of a mailbox that one session works
/// against. Built once right after synchronisation and never rebuilt, so
/// message numbers stay stable for the whole session even if another
/// session synchronises the same user's mailbox in the meantime.
#[derive(Debug, Clone)]
pub struct Snapshot {
    messages: Vec<MessageMetadata>,
}

impl Snapshot {
    /// Enumerate every persisted message for the mailbox, assigning
    /// positions in enumeration order.
    pub async fn build(mailbox: &Mailbox) -> Result<Self, MailboxError> {
        Ok(Self {
            messages: MessageMetadata::load_all(mailbox.dir()).await?,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Look up a message by its 1-based session position.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&MessageMetadata> {
        position.checked_sub(1).and_then(|idx| self.messages.get(idx))
    }

    /// All messages with their 1-based positions, in snapshot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &MessageMetadata)> {
        self.messages
            .iter()
            .enumerate()
            .map(|(idx, metadata)| (idx + 1, metadata))
    }

    /// Message count and total size over the positions not marked for
    /// deletion.
    #[must_use]
    pub fn stat(&self, deleted: &DeletionSet) -> (usize, u64) {
        self.iter()
            .filter(|(position, _)| !deleted.contains(*position))
            .fold((0, 0), |(count, size), (_, metadata)| {
                (count + 1, size + metadata.total_size)
            })
    }
}

/// Positions tentatively deleted within one session. Nothing is removed
/// from storage until the session reaches the Update phase; `RSET` wipes
/// the whole set.
#[derive(Debug, Default)]
pub struct DeletionSet {
    positions: HashSet<usize>,
}

impl DeletionSet {
    #[must_use]
    pub fn contains(&self, position: usize) -> bool {
        self.positions.contains(&position)
    }

    pub fn mark(&mut self, position: usize) {
        self.positions.insert(position);
    }

    pub fn reset(&mut self) {
        self.positions.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
