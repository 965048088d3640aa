//! Cart store.
//!
//! [`CartStore`] owns the active cart. Every mutation runs under one async lock from
//! validation through to the published snapshot, so mutations never interleave and their
//! writes reach storage in the order they were applied.

mod models;


use std::{fmt, sync::Arc};

use jiff::Timestamp;
use tokio::{
    sync::{Mutex, MutexGuard, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn};
use trolley::{
    cart::{Cart, CartError, MergeReport, check_stock, validate_request},
    items::LineItem,
    limits::MAX_QUANTITY_PER_ITEM,
    products::{Product, ProductId},
};

pub use models::{
    CartContext, CartSnapshot, CheckoutSummary, MergeOutcome, Mutation, Persistence, Phase,
};

use crate::{
    auth::{AuthProvider, Identity, UserUuid},
    catalog::ProductCatalog,
    notifications::{Notification, Notifier},
    persistence::{PersistenceBackend, ScopeKey},
};

#[derive(Debug)]
struct State {
    phase: Phase,
    context: CartContext,
    cart: Cart,

    /// The user's stored cart could not be read when this cart was loaded
    unsynced: bool,

    /// A local copy of the user's cart is waiting to be written remotely
    pending: bool,
}

struct Loaded {
    cart: Cart,
    unsynced: bool,
    pending: bool,
}

/// The single source of truth for the active cart.
pub struct CartStore {
    auth: Arc<dyn AuthProvider>,
    catalog: Arc<dyn ProductCatalog>,
    persistence: Arc<dyn PersistenceBackend>,
    notifier: Option<Arc<dyn Notifier>>,
    state: Mutex<State>,
    snapshots: watch::Sender<CartSnapshot>,
}

impl CartStore {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        catalog: Arc<dyn ProductCatalog>,
        persistence: Arc<dyn PersistenceBackend>,
    ) -> Self {
        Self {
            auth,
            catalog,
            persistence,
            notifier: None,
            state: Mutex::new(State {
                phase: Phase::Unloaded,
                context: CartContext::Guest,
                cart: Cart::new(),
                unsynced: false,
                pending: false,
            }),
            snapshots: watch::Sender::new(CartSnapshot::unloaded()),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receive the latest snapshot. Updates published faster than they are read coalesce.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshots.subscribe()
    }

    /// Run `callback` with the latest snapshot whenever one is published, until the store
    /// is dropped. A slow callback skips intermediate snapshots.
    pub fn on_change<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(&CartSnapshot) + Send + 'static,
    {
        let mut snapshots = self.snapshots.subscribe();

        tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let snapshot = snapshots.borrow_and_update().clone();
                callback(&snapshot);
            }
        })
    }

    /// Reload the cart whenever the signed-in identity changes.
    ///
    /// A reload waits for any in-flight mutation and its save to finish.
    pub fn watch_identity(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut events = self.auth.subscribe();

        tokio::spawn(async move {
            while events.changed().await.is_ok() {
                let context = CartContext::from(events.borrow_and_update().clone());
                let mut state = store.state.lock().await;

                if state.phase == Phase::Unloaded || state.context != context {
                    info!(from = %state.context, to = %context, "identity changed");

                    store.load_locked(&mut state, context).await;
                }
            }

            debug!("identity events closed");
        })
    }

    /// Load the cart for `context`, replacing the in-memory cart.
    #[instrument(skip(self, context), fields(context = %context))]
    pub async fn load(&self, context: CartContext) -> CartSnapshot {
        let mut state = self.state.lock().await;

        self.load_locked(&mut state, context).await;

        self.snapshot()
    }

    /// Load the cart for whoever is signed in right now.
    pub async fn load_current(&self) -> CartSnapshot {
        self.load(CartContext::from(self.auth.current_identity()))
            .await
    }

    /// Write the current cart to storage.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotReady`] if no cart has been loaded.
    pub async fn save(&self) -> Result<Persistence, CartError> {
        let mut state = self.lock_ready().await?;

        Ok(self.save_locked(&mut state).await)
    }

    /// Add `quantity` units of a product in `size`.
    ///
    /// Only signed-in users may add items. The product is resolved from the catalog, so
    /// the line captures the current price.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the caller is signed out, the request is invalid, the
    /// product is unknown or short of stock, or a cart limit would be exceeded.
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub async fn add_item(
        &self,
        product_id: &ProductId,
        size: &str,
        quantity: u32,
    ) -> Result<Persistence, CartError> {
        let result = self.try_add_item(product_id, size, quantity).await;

        if let Err(error) = &result {
            self.rejected(error);
        }

        result
    }

    async fn try_add_item(
        &self,
        product_id: &ProductId,
        size: &str,
        quantity: u32,
    ) -> Result<Persistence, CartError> {
        self.require_identity("add items to cart").await?;

        validate_request(product_id, size, quantity)?;

        let product = self.resolve(product_id).await?;

        let mut state = self.lock_current().await?;

        if state.context.identity().is_none() {
            return Err(CartError::AuthRequired);
        }

        let added = state.cart.add(&product, size, quantity, Timestamp::now())?;

        debug!(index = added.index(), "line added");

        let persistence = self.save_locked(&mut state).await;

        self.publish(&state);
        drop(state);

        self.notify(Notification::item_added(&product.name));

        Ok(persistence)
    }

    /// Remove the line at `index`. An index with no line is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotReady`] if no cart has been loaded.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, index: usize) -> Result<Mutation, CartError> {
        let mut state = self.lock_current().await?;

        let Some(removed) = state.cart.remove(index) else {
            debug!("no line at index");
            return Ok(Mutation::Unchanged);
        };

        let persistence = self.save_locked(&mut state).await;

        self.publish(&state);
        drop(state);

        self.notify(Notification::item_removed(&removed.name));

        Ok(Mutation::Applied(persistence))
    }

    /// Set the quantity of the line at `index`. Zero or less removes the line.
    ///
    /// Increases are checked against current stock and the cart-wide limit. Decreases are
    /// always allowed.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the quantity exceeds a limit or the stock, or the
    /// product can no longer be resolved for an increase.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        index: usize,
        quantity: i64,
    ) -> Result<Mutation, CartError> {
        let result = self.try_update_item_quantity(index, quantity).await;

        if let Err(error) = &result {
            self.rejected(error);
        }

        result
    }

    async fn try_update_item_quantity(
        &self,
        index: usize,
        quantity: i64,
    ) -> Result<Mutation, CartError> {
        if quantity <= 0 {
            return self.remove_item(index).await;
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let mut state = self.lock_current().await?;

        let Some(line) = state.cart.items().get(index) else {
            debug!("no line at index");
            return Ok(Mutation::Unchanged);
        };

        let (product_id, current) = (line.product_id.clone(), line.quantity);

        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CartError::QuantityLimitExceeded {
                product_id,
                size: line.size.clone(),
                requested: quantity,
                max: MAX_QUANTITY_PER_ITEM,
            });
        }

        if quantity == current {
            return Ok(Mutation::Unchanged);
        }

        if quantity > current {
            let product = self.resolve(&product_id).await?;
            check_stock(&product, quantity)?;
        }

        state.cart.set_quantity(index, quantity)?;

        let persistence = self.save_locked(&mut state).await;

        self.publish(&state);

        Ok(Mutation::Applied(persistence))
    }

    /// Remove every line. Asking the user to confirm is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotReady`] if no cart has been loaded.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<Persistence, CartError> {
        let mut state = self.lock_current().await?;

        state.cart.clear();

        let persistence = self.save_locked(&mut state).await;

        self.publish(&state);
        drop(state);

        self.notify(Notification::cart_cleared());

        Ok(persistence)
    }

    /// Merge the guest cart into the signed-in user's cart.
    ///
    /// Lines present in both keep the larger quantity. Whatever does not fit under the cart
    /// limits stays in the guest cart; everything else is removed from it, so merging twice
    /// never duplicates lines.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::AuthRequired`] when signed out, or
    /// [`CartError::PersistenceFailure`] if the guest cart cannot be read.
    #[instrument(skip(self))]
    pub async fn merge_guest_cart(&self) -> Result<MergeOutcome, CartError> {
        self.require_identity("merge your saved cart").await?;

        let mut state = self.lock_current().await?;

        let Some(identity) = state.context.identity().cloned() else {
            return Err(CartError::AuthRequired);
        };

        let guest = match self.persistence.read(&ScopeKey::Guest).await {
            Ok(items) => Cart::restore(items.unwrap_or_default()),
            Err(error) => {
                warn!(%error, "could not read guest cart");
                return Err(CartError::PersistenceFailure);
            }
        };

        if guest.is_empty() {
            return Ok(MergeOutcome {
                report: MergeReport::default(),
                mutation: Mutation::Unchanged,
                guest_cleared: true,
            });
        }

        let report = state.cart.merge(guest.items());
        let persistence = self.save_locked(&mut state).await;

        self.publish(&state);

        // Guest lines are only let go once the merged cart is stored remotely.
        let guest_cleared = persistence.is_saved()
            && match self
                .persistence
                .write(&ScopeKey::Guest, &report.dropped)
                .await
            {
                Ok(()) => report.dropped.is_empty(),
                Err(error) => {
                    warn!(%error, "could not rewrite guest cart after merge");
                    false
                }
            };

        info!(
            user = %identity,
            merged = report.merged,
            appended = report.appended,
            dropped = report.dropped.len(),
            "merged guest cart"
        );

        Ok(MergeOutcome {
            report,
            mutation: Mutation::Applied(persistence),
            guest_cleared,
        })
    }

    /// Gate for the checkout flow: a signed-in user with a non-empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::AuthRequired`] when signed out and [`CartError::EmptyCart`] when
    /// there is nothing to buy.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<CheckoutSummary, CartError> {
        let result = self.try_checkout().await;

        if let Err(error) = &result {
            self.rejected(error);
        }

        result
    }

    async fn try_checkout(&self) -> Result<CheckoutSummary, CartError> {
        self.require_identity("proceed to checkout").await?;

        let state = self.lock_current().await?;

        let Some(identity) = state.context.identity().cloned() else {
            return Err(CartError::AuthRequired);
        };

        if state.cart.is_empty() {
            return Err(CartError::EmptyCart);
        }

        Ok(CheckoutSummary {
            identity,
            items: state.cart.items().to_vec(),
            totals: state.cart.totals(),
        })
    }

    async fn require_identity(&self, action: &str) -> Result<Identity, CartError> {
        if let Some(identity) = self.auth.current_identity() {
            return Ok(identity);
        }

        self.auth.require_login(action).await;

        Err(CartError::AuthRequired)
    }

    async fn resolve(&self, product_id: &ProductId) -> Result<Product, CartError> {
        match self.catalog.get_product(product_id).await {
            Ok(Some(product)) => Ok(product),
            Ok(None) => Err(CartError::ProductNotFound(product_id.clone())),
            Err(error) => {
                warn!(%product_id, %error, "catalog lookup failed");
                Err(CartError::CatalogUnavailable)
            }
        }
    }

    async fn lock_ready(&self) -> Result<MutexGuard<'_, State>, CartError> {
        let state = self.state.lock().await;

        if state.phase == Phase::Unloaded {
            return Err(CartError::NotReady);
        }

        Ok(state)
    }

    /// Lock the state, first switching to the cart of whoever is signed in now.
    async fn lock_current(&self) -> Result<MutexGuard<'_, State>, CartError> {
        let mut state = self.lock_ready().await?;
        let context = CartContext::from(self.auth.current_identity());

        if state.context != context {
            info!(from = %state.context, to = %context, "identity changed");

            self.load_locked(&mut state, context).await;
        }

        Ok(state)
    }

    async fn load_locked(&self, state: &mut State, context: CartContext) {
        state.phase = Phase::Loading;
        state.context = context;
        self.publish(state);

        let loaded = match state.context.identity().cloned() {
            None => Loaded {
                cart: Cart::restore(self.read_or_empty(ScopeKey::Guest).await),
                unsynced: false,
                pending: false,
            },
            Some(identity) => self.load_user(&identity).await,
        };

        state.cart = loaded.cart;
        state.unsynced = loaded.unsynced;
        state.pending = loaded.pending;
        state.phase = Phase::Ready;
        self.publish(state);

        info!(context = %state.context, lines = state.cart.len(), "cart loaded");
    }

    /// Build a user's cart from their stored cart and any local copy a failed save left behind.
    async fn load_user(&self, identity: &Identity) -> Loaded {
        let stored = self.persistence.read(&ScopeKey::User(identity.uuid)).await;

        let pending = match self.persistence.read(&ScopeKey::Pending(identity.uuid)).await {
            Ok(items) => items.filter(|items| !items.is_empty()),
            Err(error) => {
                warn!(user = %identity, %error, "could not read local copy of user cart");
                None
            }
        };

        match (stored, pending) {
            (Ok(stored), Some(pending)) => {
                info!(user = %identity, "restoring changes that were not saved remotely");

                let mut cart = Cart::restore(stored.unwrap_or_default());
                merge_into(&mut cart, &pending);

                Loaded {
                    cart,
                    unsynced: false,
                    pending: true,
                }
            }
            (Err(error), Some(pending)) => {
                warn!(user = %identity, %error, "could not read user cart, showing the local copy");

                Loaded {
                    cart: Cart::restore(pending),
                    unsynced: true,
                    pending: true,
                }
            }
            (Ok(Some(items)), None) => Loaded {
                cart: Cart::restore(items),
                unsynced: false,
                pending: false,
            },
            (Ok(None), None) => {
                info!(user = %identity, "no saved cart for user, showing the guest cart");

                Loaded {
                    cart: Cart::restore(self.read_or_empty(ScopeKey::Guest).await),
                    unsynced: false,
                    pending: false,
                }
            }
            (Err(error), None) => {
                warn!(user = %identity, %error, "could not read user cart, showing the guest cart");

                Loaded {
                    cart: Cart::restore(self.read_or_empty(ScopeKey::Guest).await),
                    unsynced: true,
                    pending: false,
                }
            }
        }
    }

    async fn read_or_empty(&self, scope: ScopeKey) -> Vec<LineItem> {
        match self.persistence.read(&scope).await {
            Ok(items) => items.unwrap_or_default(),
            Err(error) => {
                warn!(%scope, %error, "could not read stored cart, starting empty");
                Vec::new()
            }
        }
    }

    /// Write the cart to the current context's scope.
    ///
    /// A user cart built while the stored one was unreadable is merged into the stored cart
    /// before it is written, so the stored lines are never overwritten unseen. When the remote
    /// write fails the cart goes to the user's local copy instead; the guest cart is left alone.
    async fn save_locked(&self, state: &mut State) -> Persistence {
        let Some(uuid) = state.context.identity().map(|identity| identity.uuid) else {
            return match self.persistence.write(&ScopeKey::Guest, state.cart.items()).await {
                Ok(()) => Persistence::Saved,
                Err(error) => {
                    error!(%error, "could not save guest cart");
                    Persistence::Unsaved
                }
            };
        };

        if state.unsynced {
            match self.persistence.read(&ScopeKey::User(uuid)).await {
                Ok(stored) => {
                    info!("user cart readable again, merging changes into it");

                    let mut cart = Cart::restore(stored.unwrap_or_default());
                    merge_into(&mut cart, state.cart.items());

                    state.cart = cart;
                    state.unsynced = false;
                }
                Err(error) => {
                    warn!(%error, "user cart still unreadable, keeping changes on this device");
                    return self.save_pending(state, uuid).await;
                }
            }
        }

        let scope = ScopeKey::User(uuid);

        if let Err(error) = self.persistence.write(&scope, state.cart.items()).await {
            warn!(%scope, %error, "could not save cart remotely, keeping a local copy");
            return self.save_pending(state, uuid).await;
        }

        if state.pending {
            match self.persistence.write(&ScopeKey::Pending(uuid), &[]).await {
                Ok(()) => state.pending = false,
                Err(error) => warn!(%error, "could not discard local copy of user cart"),
            }
        }

        Persistence::Saved
    }

    async fn save_pending(&self, state: &mut State, uuid: UserUuid) -> Persistence {
        match self
            .persistence
            .write(&ScopeKey::Pending(uuid), state.cart.items())
            .await
        {
            Ok(()) => {
                state.pending = true;
                Persistence::Degraded
            }
            Err(error) => {
                error!(%error, "could not save local copy of user cart");
                Persistence::Unsaved
            }
        }
    }

    fn publish(&self, state: &State) {
        let totals = state.cart.totals();

        debug!(
            subtotal = totals.subtotal,
            tax = totals.tax,
            shipping = totals.shipping,
            total = totals.total,
            items = totals.item_count,
            "cart totals"
        );

        self.snapshots.send_replace(CartSnapshot {
            phase: state.phase,
            context: state.context.clone(),
            items: state.cart.items().to_vec(),
            totals,
        });
    }

    fn rejected(&self, error: &CartError) {
        warn!(%error, "cart operation rejected");

        // Signed-out callers get a login prompt instead.
        if *error != CartError::AuthRequired {
            self.notify(Notification::rejected(error));
        }
    }

    fn notify(&self, notification: Notification) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };

        tokio::spawn(async move {
            notifier.notify(notification).await;
        });
    }
}

/// Merge `incoming` into `cart`, logging any lines that no longer fit.
fn merge_into(cart: &mut Cart, incoming: &[LineItem]) {
    let report = cart.merge(incoming);

    if !report.is_complete() {
        warn!(dropped = report.dropped.len(), "lines did not fit in the merged cart");
    }
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("snapshot", &*self.snapshots.borrow())
            .finish_non_exhaustive()
    }
}
