//! Trolley
//!
//! Trolley is the cart engine behind a storefront: line items, the rules that keep a cart
//! consistent, and the derived totals (subtotal, tax, shipping) shown at checkout.

pub mod cart;
pub mod fixtures;
pub mod items;
pub mod limits;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod receipt;
