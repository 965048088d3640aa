//! Cart
//!
//! The cart aggregate owns the ordered list of line items and the rules that keep it
//! consistent. Every mutation is all-or-nothing: when an operation returns an error the
//! cart is exactly as it was before the call.

use jiff::Timestamp;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    items::LineItem,
    limits::{MAX_ITEMS, MAX_QUANTITY_PER_ITEM},
    pricing::Totals,
    products::{Product, ProductId},
};

/// Errors raised by cart operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The caller must be signed in.
    #[error("login required")]
    AuthRequired,

    /// Malformed product id, size or quantity.
    #[error("invalid cart request: {0}")]
    Validation(String),

    /// The catalog has no such product.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The product is out of stock or has fewer units than requested.
    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Requested product
        product_id: ProductId,

        /// Units requested
        requested: u32,

        /// Units available
        available: u32,
    },

    /// The cart would hold more than [`MAX_ITEMS`] units.
    #[error("cart holds {current} items; adding {requested} would exceed the limit of {max}")]
    CartFull {
        /// Units currently in the cart
        current: u32,

        /// Units being added
        requested: u32,

        /// Cart-wide limit
        max: u32,
    },

    /// A line would hold more than [`MAX_QUANTITY_PER_ITEM`] units.
    #[error("at most {max} of {product_id} ({size}) allowed, requested {requested}")]
    QuantityLimitExceeded {
        /// Line product
        product_id: ProductId,

        /// Line size
        size: String,

        /// Resulting line quantity
        requested: u32,

        /// Per-line limit
        max: u32,
    },

    /// The cart is still loading, or was never loaded.
    #[error("cart is not ready")]
    NotReady,

    /// The operation needs at least one line.
    #[error("cart is empty")]
    EmptyCart,

    /// The catalog could not be reached.
    #[error("product catalog unavailable")]
    CatalogUnavailable,

    /// Stored cart data could not be read.
    #[error("cart storage unavailable")]
    PersistenceFailure,
}

/// Where an added quantity ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddedLine {
    /// A new line was appended at `index`.
    Appended {
        /// Index of the new line
        index: usize,
    },

    /// An existing line at `index` was incremented to `quantity`.
    Merged {
        /// Index of the existing line
        index: usize,

        /// Quantity after the increment
        quantity: u32,
    },
}

impl AddedLine {
    /// Index of the affected line.
    pub fn index(&self) -> usize {
        match self {
            Self::Appended { index } | Self::Merged { index, .. } => *index,
        }
    }
}

/// Result of setting a line's quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityChange {
    /// The index did not refer to a line.
    Unchanged,

    /// The line was removed.
    Removed(LineItem),

    /// The line quantity changed.
    Updated {
        /// Quantity before
        from: u32,

        /// Quantity after
        to: u32,
    },
}

/// Outcome of merging another cart's lines into this one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Lines whose key already existed; the larger quantity was kept
    pub merged: usize,

    /// Lines appended as new
    pub appended: usize,

    /// Quantities that could not be carried over because of the cart-wide limit
    pub dropped: SmallVec<[LineItem; 4]>,
}

impl MergeReport {
    /// Whether every incoming unit was carried over.
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Validate the shape of an add request before anything is looked up.
///
/// # Errors
///
/// Returns [`CartError::Validation`] for a blank product id or size, or a zero quantity.
pub fn validate_request(product_id: &ProductId, size: &str, quantity: u32) -> Result<(), CartError> {
    if product_id.is_blank() {
        return Err(CartError::Validation("product id is required".to_string()));
    }

    if size.trim().is_empty() {
        return Err(CartError::Validation("size is required".to_string()));
    }

    if quantity < 1 {
        return Err(CartError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Check that `quantity` units of `product` can be bought.
///
/// # Errors
///
/// Returns [`CartError::InsufficientStock`] when the product is out of stock or short.
pub fn check_stock(product: &Product, quantity: u32) -> Result<(), CartError> {
    if product.has_stock_for(quantity) {
        return Ok(());
    }

    Err(CartError::InsufficientStock {
        product_id: product.id.clone(),
        requested: quantity,
        available: if product.in_stock {
            product.stock_count
        } else {
            0
        },
    })
}

/// Cart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from stored lines.
    ///
    /// Stored data is not trusted to uphold the line invariants: duplicate keys are folded
    /// into the first occurrence, empty lines are dropped and quantities are clamped to
    /// [`MAX_QUANTITY_PER_ITEM`]. The cart-wide limit is not applied, so nothing already
    /// saved is lost.
    pub fn restore(items: impl IntoIterator<Item = LineItem>) -> Self {
        let mut cart = Self::new();

        for item in items {
            if item.quantity == 0 {
                continue;
            }

            if let Some(existing) = cart
                .items
                .iter_mut()
                .find(|line| line.is(&item.product_id, &item.size))
            {
                existing.quantity = existing
                    .quantity
                    .saturating_add(item.quantity)
                    .min(MAX_QUANTITY_PER_ITEM);
            } else {
                let quantity = item.quantity.min(MAX_QUANTITY_PER_ITEM);
                cart.items.push(LineItem { quantity, ..item });
            }
        }

        cart
    }

    /// Lines in display order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Consume the cart, returning its lines.
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u32 {
        crate::pricing::item_count(&self.items)
    }

    /// Position of the line for `product_id` in `size`.
    pub fn find(&self, product_id: &ProductId, size: &str) -> Option<usize> {
        self.items.iter().position(|line| line.is(product_id, size))
    }

    /// Recompute derived totals.
    pub fn totals(&self) -> Totals {
        Totals::from_items(&self.items)
    }

    /// Add `quantity` units of `product` in `size`.
    ///
    /// An existing line for the same product and size is incremented; otherwise a new line
    /// is appended with the product's current unit price.
    ///
    /// # Errors
    ///
    /// - [`CartError::Validation`]: blank id or size, zero quantity, or a size the product
    ///   does not offer.
    /// - [`CartError::InsufficientStock`]: the product cannot supply `quantity` units.
    /// - [`CartError::CartFull`]: the cart would exceed [`MAX_ITEMS`] units.
    /// - [`CartError::QuantityLimitExceeded`]: the line would exceed [`MAX_QUANTITY_PER_ITEM`].
    pub fn add(
        &mut self,
        product: &Product,
        size: &str,
        quantity: u32,
        now: Timestamp,
    ) -> Result<AddedLine, CartError> {
        validate_request(&product.id, size, quantity)?;

        if !product.offers_size(size) {
            return Err(CartError::Validation(format!(
                "{} is not offered in size {size}",
                product.id
            )));
        }

        check_stock(product, quantity)?;

        // Uses the aggregate before the add, whether or not the line already exists.
        let current = self.item_count();

        if current.saturating_add(quantity) > MAX_ITEMS {
            return Err(CartError::CartFull {
                current,
                requested: quantity,
                max: MAX_ITEMS,
            });
        }

        if let Some((index, line)) = self
            .items
            .iter_mut()
            .enumerate()
            .find(|(_, line)| line.is(&product.id, size))
        {
            let merged = line.quantity.saturating_add(quantity);

            if merged > MAX_QUANTITY_PER_ITEM {
                return Err(quantity_limit(&product.id, size, merged));
            }

            line.quantity = merged;

            return Ok(AddedLine::Merged {
                index,
                quantity: merged,
            });
        }

        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(quantity_limit(&product.id, size, quantity));
        }

        self.items
            .push(LineItem::from_product(product, size, quantity, now));

        Ok(AddedLine::Appended {
            index: self.items.len() - 1,
        })
    }

    /// Remove the line at `index`. Out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<LineItem> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Set the quantity of the line at `index`.
    ///
    /// A quantity of zero removes the line. Out-of-range indices are ignored. Increases are
    /// checked against the cart-wide limit; stock is the caller's concern since it needs the
    /// catalog.
    ///
    /// # Errors
    ///
    /// - [`CartError::QuantityLimitExceeded`]: `quantity` exceeds [`MAX_QUANTITY_PER_ITEM`].
    /// - [`CartError::CartFull`]: the increase would push the cart past [`MAX_ITEMS`].
    pub fn set_quantity(&mut self, index: usize, quantity: u32) -> Result<QuantityChange, CartError> {
        if quantity == 0 {
            return Ok(self
                .remove(index)
                .map_or(QuantityChange::Unchanged, QuantityChange::Removed));
        }

        let current = self.item_count();

        let Some(line) = self.items.get_mut(index) else {
            return Ok(QuantityChange::Unchanged);
        };

        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(quantity_limit(&line.product_id, &line.size, quantity));
        }

        let from = line.quantity;

        if quantity > from {
            let increase = quantity - from;

            if current.saturating_add(increase) > MAX_ITEMS {
                return Err(CartError::CartFull {
                    current,
                    requested: increase,
                    max: MAX_ITEMS,
                });
            }
        }

        line.quantity = quantity;

        Ok(QuantityChange::Updated { from, to: quantity })
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Merge lines from another cart into this one.
    ///
    /// Lines are matched on product and size. When both carts hold a line, the larger of the
    /// two quantities is kept, so merging a cart that was copied from this one never doubles
    /// anything. The existing line keeps its captured price. New lines are appended in order
    /// with their own captured price. Units that would push the cart past [`MAX_ITEMS`] are
    /// returned in [`MergeReport::dropped`] instead of being carried over.
    pub fn merge(&mut self, incoming: &[LineItem]) -> MergeReport {
        let mut report = MergeReport::default();

        for line in incoming.iter().filter(|line| line.quantity > 0) {
            let capacity = MAX_ITEMS.saturating_sub(self.item_count());
            let wanted = line.quantity.min(MAX_QUANTITY_PER_ITEM);

            let taken = if let Some(existing) = self
                .items
                .iter_mut()
                .find(|existing| existing.is(&line.product_id, &line.size))
            {
                let increase = wanted.saturating_sub(existing.quantity).min(capacity);
                existing.quantity += increase;
                report.merged += 1;

                // Units already present count as carried over.
                existing.quantity.min(line.quantity)
            } else {
                let taken = wanted.min(capacity);

                if taken > 0 {
                    self.items.push(LineItem {
                        quantity: taken,
                        ..line.clone()
                    });
                    report.appended += 1;
                }

                taken
            };

            if taken < line.quantity {
                report.dropped.push(LineItem {
                    quantity: line.quantity - taken,
                    ..line.clone()
                });
            }
        }

        report
    }
}

fn quantity_limit(product_id: &ProductId, size: &str, requested: u32) -> CartError {
    CartError::QuantityLimitExceeded {
        product_id: product_id.clone(),
        size: size.to_string(),
        requested,
        max: MAX_QUANTITY_PER_ITEM,
    }
}
