//! Local/remote routing.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use trolley::items::LineItem;

use super::{PersistenceBackend, PersistenceError, ScopeKey};

/// Routes device-local scopes to a local backend and user scopes to a remote one.
#[derive(Clone)]
pub struct SplitBackend {
    local: Arc<dyn PersistenceBackend>,
    remote: Arc<dyn PersistenceBackend>,
}

impl SplitBackend {
    pub fn new(local: Arc<dyn PersistenceBackend>, remote: Arc<dyn PersistenceBackend>) -> Self {
        Self { local, remote }
    }

    fn route(&self, scope: &ScopeKey) -> &dyn PersistenceBackend {
        match scope {
            ScopeKey::Guest | ScopeKey::Pending(_) => self.local.as_ref(),
            ScopeKey::User(_) => self.remote.as_ref(),
        }
    }
}

impl fmt::Debug for SplitBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitBackend").finish_non_exhaustive()
    }
}

#[async_trait]
impl PersistenceBackend for SplitBackend {
    async fn read(&self, scope: &ScopeKey) -> Result<Option<Vec<LineItem>>, PersistenceError> {
        self.route(scope).read(scope).await
    }

    async fn write(&self, scope: &ScopeKey, items: &[LineItem]) -> Result<(), PersistenceError> {
        self.route(scope).write(scope, items).await
    }
}
