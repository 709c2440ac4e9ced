use crate::{internal, store::ObjectStore};

use super::{validate_name, Index, Mailbox, MailboxError, MessageMetadata};

/// Reconcile the remote listing with the local mailbox.
///
/// Every remote object not yet in the index is fetched, written locally,
/// measured, and only then recorded in the ledger, in the listing's own
/// order. Any failure aborts the whole run: whatever was indexed before
/// the failure stays indexed, and the next run picks up the rest. With an
/// unchanged listing this is a no-op that issues zero fetches.
///
/// Returns the number of newly indexed messages.
pub async fn sync(store: &dyn ObjectStore, mailbox: &Mailbox) -> Result<usize, MailboxError> {
    let keys = store.list(mailbox.user()).await?;
    let mut index = Index::load(mailbox.dir()).await;
    let mut fetched = 0;

    for key in keys {
        let remote_id = key.rsplit('/').next().unwrap_or(key.as_str());
        if validate_name(remote_id).is_err() {
            internal!(level = WARN, "Skipping unusable remote key {key:?}");
            continue;
        }
        if index.contains(remote_id) {
            continue;
        }

        let content = store.fetch(&key).await?;
        tokio::fs::write(mailbox.message_path(remote_id), &content).await?;

        let metadata =
            MessageMetadata::from_content(remote_id, &String::from_utf8_lossy(&content));
        metadata.save(mailbox.dir()).await?;

        let entry = index.append(mailbox.dir(), remote_id).await?;
        internal!(
            "Indexed {remote_id} as message {} for {}",
            entry.sequence_id,
            mailbox.user()
        );
        fetched += 1;
    }

    Ok(fetched)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::MemoryStore;

    fn store_with(objects: &[(&str, &str)]) -> MemoryStore {
        let store = MemoryStore::new();
        for (key, content) in objects {
            store.insert(key, content.as_bytes());
        }
        store
    }

    #[tokio::test]
    async fn second_run_issues_zero_fetches() {
        let root = tempfile::tempdir().unwrap();
        let store = store_with(&[("jim/a.eml", "X: 1"), ("jim/b.eml", "X: 2")]);
        let mailbox = Mailbox::open(root.path(), "jim").await.unwrap();

        assert_eq!(sync(&store, &mailbox).await.unwrap(), 2);
        let after_first = store.fetch_count();

        assert_eq!(sync(&store, &mailbox).await.unwrap(), 0);
        assert_eq!(store.fetch_count(), after_first);
    }

    #[tokio::test]
    async fn new_objects_get_the_next_sequence_id() {
        let root = tempfile::tempdir().unwrap();
        let store = store_with(&[("jim/a.eml", "X: 1")]);
        let mailbox = Mailbox::open(root.path(), "jim").await.unwrap();
        sync(&store, &mailbox).await.unwrap();

        store.insert("jim/b.eml", b"X: 2");
        sync(&store, &mailbox).await.unwrap();

        let index = Index::load(mailbox.dir()).await;
        assert_eq!(index.entries()[0].remote_id, "a.eml");
        assert_eq!(index.entries()[0].sequence_id, 1);
        assert_eq!(index.entries()[1].remote_id, "b.eml");
        assert_eq!(index.entries()[1].sequence_id, 2);
    }

    #[tokio::test]
    async fn a_failed_fetch_aborts_and_the_next_run_resumes() {
        let root = tempfile::tempdir().unwrap();
        let store = store_with(&[("jim/a.eml", "X: 1"), ("jim/b.eml", "X: 2")]);
        store.fail_fetch("jim/b.eml");
        let mailbox = Mailbox::open(root.path(), "jim").await.unwrap();

        assert!(sync(&store, &mailbox).await.is_err());

        // a.eml was fully processed before the failure and stays indexed;
        // b.eml was not recorded
        let index = Index::load(mailbox.dir()).await;
        assert!(index.contains("a.eml"));
        assert!(!index.contains("b.eml"));

        store.heal();
        assert_eq!(sync(&store, &mailbox).await.unwrap(), 1);
        let index = Index::load(mailbox.dir()).await;
        assert_eq!(index.entries()[1].remote_id, "b.eml");
        assert_eq!(index.entries()[1].sequence_id, 2);
    }

    #[tokio::test]
    async fn json_named_objects_are_skipped_not_fetched() {
        let root = tempfile::tempdir().unwrap();
        let store = store_with(&[
            ("jim/a.eml", "X: 1"),
            ("jim/report.json", "From: x\r\n\r\nnot a sidecar\r\n"),
        ]);
        let mailbox = Mailbox::open(root.path(), "jim").await.unwrap();

        assert_eq!(sync(&store, &mailbox).await.unwrap(), 1);

        // the skipped object left no content file to shadow a sidecar,
        // and the mailbox still enumerates cleanly
        assert!(!root.path().join("jim/report.json").exists());
        let all = MessageMetadata::load_all(mailbox.dir()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].remote_id, "a.eml");
    }

    #[tokio::test]
    async fn downloaded_content_lands_next_to_its_sidecar() {
        let root = tempfile::tempdir().unwrap();
        let store = store_with(&[("jim/a.eml", "X: 1\r\n\r\nhello\r\n")]);
        let mailbox = Mailbox::open(root.path(), "jim").await.unwrap();
        sync(&store, &mailbox).await.unwrap();

        assert_eq!(
            mailbox.read_message("a.eml").await.unwrap(),
            "X: 1\r\n\r\nhello\r\n"
        );

        let all = MessageMetadata::load_all(mailbox.dir()).await.unwrap();
        assert_eq!(all.len(), 1);
        // "X: 1" (4+2) + "" (0+2) + "hello" (5+2)
        assert_eq!(all[0].total_size, 15);
    }
}
