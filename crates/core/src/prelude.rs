//! Trolley prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{AddedLine, Cart, CartError, MergeReport, QuantityChange},
    fixtures::{CatalogFixture, FixtureError},
    items::{LineItem, LineKey},
    limits::{
        FREE_SHIPPING_THRESHOLD, MAX_ITEMS, MAX_QUANTITY_PER_ITEM, SHIPPING_FLAT, TAX_RATE,
        currency,
    },
    pricing::Totals,
    products::{Product, ProductId, ProductRecord, ProductRecordError},
    receipt::{Receipt, ReceiptError},
};
