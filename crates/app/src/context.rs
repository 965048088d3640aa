//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    auth::SessionAuth,
    catalog::{CatalogError, FixtureCatalog},
    config::StoreConfig,
    notifications::LogNotifier,
    persistence::{JsonFileBackend, SplitBackend},
    store::CartStore,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to load product catalog")]
    Catalog(#[source] CatalogError),
}

#[derive(Clone)]
pub struct AppContext {
    pub auth: Arc<SessionAuth>,
    pub catalog: Arc<FixtureCatalog>,
    pub store: Arc<CartStore>,
}

impl AppContext {
    /// Build application context from store configuration.
    ///
    /// Guest carts are kept under `local/` and user carts under `remote/` in the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the product catalog cannot be loaded.
    pub fn from_config(config: &StoreConfig) -> Result<Self, AppInitError> {
        let catalog =
            Arc::new(FixtureCatalog::from_path(&config.catalog).map_err(AppInitError::Catalog)?);

        let auth = Arc::new(SessionAuth::new(config.identity()));

        let persistence = Arc::new(SplitBackend::new(
            Arc::new(JsonFileBackend::new(config.local_dir())),
            Arc::new(JsonFileBackend::new(config.remote_dir())),
        ));

        let store = CartStore::new(auth.clone(), catalog.clone(), persistence)
            .with_notifier(Arc::new(LogNotifier));

        Ok(Self {
            auth,
            catalog,
            store: Arc::new(store),
        })
    }
}
