//! Items

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::products::{Product, ProductId};

/// Identity of a line within a cart: one line per product and size.
pub type LineKey<'a> = (&'a ProductId, &'a str);

/// A product, in a given size and quantity, as it sits in a cart.
///
/// Name, image and category are a snapshot taken when the line was first added, and
/// `price` is the unit price captured at that moment. Amounts are in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Catalog product this line refers to
    pub product_id: ProductId,

    /// Product name at add-time
    pub name: String,

    /// Product image at add-time
    #[serde(default)]
    pub image: Option<String>,

    /// Product category at add-time
    #[serde(default)]
    pub category: Option<String>,

    /// Size variant
    pub size: String,

    /// Units on this line
    pub quantity: u32,

    /// Unit price paid (sale price if the product was on sale)
    pub price: i64,

    /// Regular unit price, kept to show the discount
    pub original_price: i64,

    /// When the line was first inserted
    pub added_at: Timestamp,
}

impl LineItem {
    /// Build a new line from a catalog product, capturing its current price.
    pub fn from_product(product: &Product, size: &str, quantity: u32, added_at: Timestamp) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            image: product.image.clone(),
            category: product.category.clone(),
            size: size.to_string(),
            quantity,
            price: product.unit_price(),
            original_price: product.regular_price,
            added_at,
        }
    }

    /// Identity key of the line.
    pub fn key(&self) -> LineKey<'_> {
        (&self.product_id, self.size.as_str())
    }

    /// Whether this line is for the given product and size.
    pub fn is(&self, product_id: &ProductId, size: &str) -> bool {
        self.product_id == *product_id && self.size == size
    }

    /// Price of the whole line.
    pub fn line_total(&self) -> i64 {
        self.price.saturating_mul(i64::from(self.quantity))
    }

    /// Amount saved on the whole line against the regular price.
    pub fn savings(&self) -> i64 {
        self.original_price
            .saturating_sub(self.price)
            .max(0)
            .saturating_mul(i64::from(self.quantity))
    }
}
