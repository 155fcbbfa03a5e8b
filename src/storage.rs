//! Object storage capability.
//!
//! The pipeline sees a narrow `put` + `signed_read_url` interface. The
//! shipped implementation is a local filesystem store composing public links
//! from a configured base URL; cloud backends implement the same trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Opaque handle to a stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
}

/// Durable object storage for build artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads the file at `file` under `key`, overwriting any prior object.
    async fn put(&self, key: &str, file: &Path) -> Result<StoredObject>;

    /// A read URL for `object`, valid for roughly `ttl`.
    fn signed_read_url(&self, object: &StoredObject, ttl: Duration) -> String;
}

/// Filesystem-backed store for single-node deployments.
///
/// Objects land under `root/<key>`; read URLs are composed from
/// `public_base_url` with an `expires` timestamp, on the assumption that a
/// front proxy serves the root directory.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, file: &Path) -> Result<StoredObject> {
        let dest = self.root.join(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create store path {}", parent.display()))?;
        }

        tokio::fs::copy(file, &dest)
            .await
            .with_context(|| format!("failed to store object at {}", dest.display()))?;

        debug!(key, dest = %dest.display(), "object stored");
        Ok(StoredObject {
            key: key.to_string(),
        })
    }

    fn signed_read_url(&self, object: &StoredObject, ttl: Duration) -> String {
        let expires = chrono::Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        format!(
            "{}/{}?expires={}",
            self.public_base_url,
            object.key,
            expires.timestamp()
        )
    }
}
