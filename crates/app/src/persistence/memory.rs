//! In-memory backend.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use trolley::items::LineItem;

use super::{PersistenceBackend, PersistenceError, ScopeKey};

/// Backend that keeps carts in process memory.
///
/// It can be switched offline to stand in for an unreachable remote store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    carts: RwLock<FxHashMap<ScopeKey, Vec<LineItem>>>,
    offline: AtomicBool,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`PersistenceError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Lines currently stored for `scope`, bypassing the offline switch.
    pub async fn stored(&self, scope: &ScopeKey) -> Option<Vec<LineItem>> {
        self.carts.read().await.get(scope).cloned()
    }

    fn check_online(&self) -> Result<(), PersistenceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("backend offline".to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl PersistenceBackend for MemoryBackend {
    async fn read(&self, scope: &ScopeKey) -> Result<Option<Vec<LineItem>>, PersistenceError> {
        self.check_online()?;

        Ok(self.carts.read().await.get(scope).cloned())
    }

    async fn write(&self, scope: &ScopeKey, items: &[LineItem]) -> Result<(), PersistenceError> {
        self.check_online()?;

        self.carts.write().await.insert(*scope, items.to_vec());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;
    use trolley::products::ProductId;

    use super::*;
    use crate::auth::UserUuid;

    fn line() -> LineItem {
        LineItem {
            product_id: ProductId::new("p1"),
            name: "P1".to_string(),
            image: None,
            category: None,
            size: "M".to_string(),
            quantity: 1,
            price: 100_00,
            original_price: 100_00,
            added_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn scopes_are_isolated() -> TestResult {
        let backend = MemoryBackend::new();
        let user = ScopeKey::User(UserUuid::now_v7());

        backend.write(&ScopeKey::Guest, &[line()]).await?;

        assert_eq!(backend.read(&ScopeKey::Guest).await?, Some(vec![line()]));
        assert_eq!(backend.read(&user).await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn offline_backend_fails() -> TestResult {
        let backend = MemoryBackend::new();
        backend.write(&ScopeKey::Guest, &[line()]).await?;

        backend.set_offline(true);

        assert!(matches!(
            backend.read(&ScopeKey::Guest).await,
            Err(PersistenceError::Unavailable(_))
        ));
        assert!(matches!(
            backend.write(&ScopeKey::Guest, &[]).await,
            Err(PersistenceError::Unavailable(_))
        ));
        assert_eq!(backend.stored(&ScopeKey::Guest).await, Some(vec![line()]));

        Ok(())
    }
}
