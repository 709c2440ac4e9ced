use std::path::PathBuf;

use async_trait::async_trait;

use super::{ObjectStore, StoreError};

/// Directory-backed object store: every object is a file at
/// `<root>/<key>`, and a prefix is a directory under the root.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join(prefix);

        // An absent prefix is an empty mailbox, not an error
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(format!("{prefix}/{}", entry.file_name().to_string_lossy()));
            }
        }

        keys.sort_unstable();
        Ok(keys)
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        match tokio::fs::read(self.root.join(key)).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn missing_prefix_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().to_path_buf());

        assert!(store.list("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_lexically_and_fetches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("jim")).unwrap();
        std::fs::write(dir.path().join("jim/b.eml"), b"second").unwrap();
        std::fs::write(dir.path().join("jim/a.eml"), b"first").unwrap();

        let store = FsStore::new(dir.path().to_path_buf());
        let keys = store.list("jim").await.unwrap();
        assert_eq!(keys, vec!["jim/a.eml".to_string(), "jim/b.eml".to_string()]);

        assert_eq!(store.fetch("jim/a.eml").await.unwrap(), b"first");
        assert!(matches!(
            store.fetch("jim/c.eml").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
