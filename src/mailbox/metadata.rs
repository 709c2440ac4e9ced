use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::MailboxError;

/// Suffix of the per-message metadata file stored next to the content.
pub(crate) const SIDECAR_SUFFIX: &str = ".json";

/// Cached per-message facts, computed once when the message is first
/// downloaded and reloaded verbatim on every later session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub remote_id: String,
    pub header_size: u64,
    pub body_size: u64,
    pub total_size: u64,
    pub read: bool,
}

impl MessageMetadata {
    /// Derive the metadata for a freshly downloaded message.
    ///
    /// Sizes count every line as `len + 2` for the CRLF terminator,
    /// regardless of how the stored file actually ends its lines.
    #[must_use]
    pub fn from_content(remote_id: &str, content: &str) -> Self {
        let (headers, body) = split_blocks(content);
        let header_size = block_size(&headers);
        let body_size = block_size(&body);

        Self {
            remote_id: remote_id.to_string(),
            header_size,
            body_size,
            total_size: header_size + body_size,
            read: false,
        }
    }

    /// Persist this metadata as a sidecar file in the mailbox directory.
    pub async fn save(&self, dir: &Path) -> Result<(), MailboxError> {
        let json = serde_json::to_vec(self)?;
        tokio::fs::write(sidecar_path(dir, &self.remote_id), json).await?;
        Ok(())
    }

    /// Load every metadata sidecar in a mailbox directory, ordered
    /// lexically by remote id. Sessions enumerate this to build their
    /// snapshot, so the ordering must be deterministic.
    pub async fn load_all(dir: &Path) -> Result<Vec<Self>, MailboxError> {
        let mut sidecars = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(SIDECAR_SUFFIX) {
                sidecars.push(entry.path());
            }
        }
        sidecars.sort_unstable();

        let mut all = Vec::with_capacity(sidecars.len());
        for path in sidecars {
            let raw = tokio::fs::read(&path).await?;
            all.push(serde_json::from_slice(&raw)?);
        }

        Ok(all)
    }
}

pub(crate) fn sidecar_path(dir: &Path, remote_id: &str) -> PathBuf {
    dir.join(format!("{remote_id}{SIDECAR_SUFFIX}"))
}

/// Split a raw message into its header and body blocks at the first blank
/// line. The separator line itself belongs to the body block, as do any
/// further blank lines. A message without a blank line is all headers.
///
/// This is deliberately distinct from the protocol's line framing: no
/// escaping happens here.
#[must_use]
pub fn split_blocks(content: &str) -> (Vec<&str>, Vec<&str>) {
    let mut headers = Vec::new();
    let mut body = Vec::new();
    let mut in_headers = true;

    for line in content.lines() {
        if line.is_empty() && in_headers {
            in_headers = false;
        }

        if in_headers {
            headers.push(line);
        } else {
            body.push(line);
        }
    }

    (headers, body)
}

fn block_size(lines: &[&str]) -> u64 {
    lines.iter().map(|line| line.len() as u64 + 2).sum()
}
