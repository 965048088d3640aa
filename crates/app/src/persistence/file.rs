//! JSON file backend.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;
use trolley::items::LineItem;

use super::{PersistenceBackend, PersistenceError, ScopeKey};

/// On-disk layout of a stored cart.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCart {
    items: Vec<LineItem>,
    saved_at: Timestamp,
}

/// Backend that stores each scope as a JSON file in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File the cart for `scope` is stored in.
    #[must_use]
    pub fn path_for(&self, scope: &ScopeKey) -> PathBuf {
        self.dir.join(format!("{}.json", scope.storage_key()))
    }
}

#[async_trait]
impl PersistenceBackend for JsonFileBackend {
    async fn read(&self, scope: &ScopeKey) -> Result<Option<Vec<LineItem>>, PersistenceError> {
        let bytes = match fs::read(self.path_for(scope)).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let stored: StoredCart = serde_json::from_slice(&bytes)?;

        Ok(Some(stored.items))
    }

    async fn write(&self, scope: &ScopeKey, items: &[LineItem]) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).await?;

        let stored = StoredCart {
            items: items.to_vec(),
            saved_at: Timestamp::now(),
        };

        let path = self.path_for(scope);
        let staging = path.with_extension("json.tmp");

        fs::write(&staging, serde_json::to_vec_pretty(&stored)?).await?;
        fs::rename(&staging, &path).await?;

        debug!(path = %path.display(), lines = items.len(), "wrote cart");

        Ok(())
    }
}
