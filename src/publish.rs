//! Artifact publication: upload under a namespaced key, mint a read URL.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::StageError;
use crate::storage::ObjectStore;

pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
    url_ttl: Duration,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>, key_prefix: String, url_ttl: Duration) -> Self {
        Self {
            store,
            key_prefix,
            url_ttl,
        }
    }

    /// Uploads the artifact and returns its time-limited read URL.
    pub async fn publish(&self, artifact: &Path, name: &str) -> Result<String, StageError> {
        let key = format!("{}/{}", self.key_prefix.trim_end_matches('/'), name);

        let object = self
            .store
            .put(&key, artifact)
            .await
            .map_err(|e| StageError::Publish(format!("{:#}", e)))?;

        let url = self.store.signed_read_url(&object, self.url_ttl);
        info!(key, "artifact published");
        Ok(url)
    }
}
