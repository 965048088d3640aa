//! Products

use std::fmt;

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::limits::currency;

/// Opaque product identifier, as issued by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a product identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Product, as resolved from the catalog at the moment it is looked up.
///
/// Prices are in minor units of [`currency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,

    /// Display name
    pub name: String,

    /// Image path or URL
    pub image: Option<String>,

    /// Category slug
    pub category: Option<String>,

    /// Regular (list) price
    pub regular_price: i64,

    /// Sale price, if one is set
    pub sale_price: Option<i64>,

    /// Whether the product is flagged as on sale
    pub on_sale: bool,

    /// Whether the product can be bought at all
    pub in_stock: bool,

    /// Units available
    pub stock_count: u32,

    /// Size variants on offer
    pub available_sizes: Vec<String>,
}

impl Product {
    /// The price a customer pays per unit: the sale price when one is set, else the regular price.
    pub fn unit_price(&self) -> i64 {
        self.sale_price
            .filter(|price| *price > 0)
            .unwrap_or(self.regular_price)
    }

    /// Whether `quantity` units can currently be bought.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        self.in_stock && quantity <= self.stock_count
    }

    /// Whether the product is offered in `size`.
    ///
    /// Products that list no sizes accept any size.
    pub fn offers_size(&self, size: &str) -> bool {
        self.available_sizes.is_empty() || self.available_sizes.iter().any(|s| s == size)
    }

    /// Discount of the sale price against the regular price.
    ///
    /// Zero unless the product is on sale with a sale price below the regular price.
    pub fn discount_percent(&self) -> Percentage {
        let Some(sale_price) = self.sale_price.filter(|_| self.on_sale) else {
            return Percentage::from(Decimal::ZERO);
        };

        if self.regular_price <= 0 || sale_price >= self.regular_price {
            return Percentage::from(Decimal::ZERO);
        }

        let ratio = Decimal::from(sale_price) / Decimal::from(self.regular_price);

        Percentage::from((Decimal::ONE - ratio).round_dp(2))
    }
}

/// Errors raised while adapting an external product record.
#[derive(Debug, Error, PartialEq)]
pub enum ProductRecordError {
    /// The record has no identifier.
    #[error("product record has an empty id")]
    BlankId,

    /// A price is negative or too large to represent.
    #[error("invalid {field} for product {id}: {value}")]
    InvalidPrice {
        /// Product identifier
        id: String,

        /// Offending field name
        field: &'static str,

        /// Offending value, in major units
        value: Decimal,
    },
}

/// Product as served by the catalog store.
///
/// Prices are in major units. Field names are accepted in both camelCase and snake_case,
/// since the catalog has served both spellings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Product identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Regular price
    #[serde(alias = "regular_price")]
    pub regular_price: Decimal,

    /// Sale price
    #[serde(default, alias = "sale_price")]
    pub sale_price: Option<Decimal>,

    /// Sale flag
    #[serde(default, alias = "on_sale")]
    pub on_sale: bool,

    /// Image path or URL
    #[serde(default)]
    pub image: Option<String>,

    /// Category slug
    #[serde(default)]
    pub category: Option<String>,

    /// Availability flag
    #[serde(default = "default_in_stock", alias = "in_stock")]
    pub in_stock: bool,

    /// Units available
    #[serde(default, alias = "stock_count")]
    pub stock_count: u32,

    /// Size variants
    #[serde(default, alias = "available_sizes")]
    pub available_sizes: Vec<String>,
}

fn default_in_stock() -> bool {
    true
}

impl TryFrom<ProductRecord> for Product {
    type Error = ProductRecordError;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err(ProductRecordError::BlankId);
        }

        let regular_price = to_minor(&record.id, "regular price", record.regular_price)?;

        let sale_price = record
            .sale_price
            .map(|price| to_minor(&record.id, "sale price", price))
            .transpose()?;

        Ok(Self {
            id: ProductId::new(record.id),
            name: record.name,
            image: record.image,
            category: record.category,
            regular_price,
            sale_price,
            on_sale: record.on_sale,
            in_stock: record.in_stock,
            stock_count: record.stock_count,
            available_sizes: record.available_sizes,
        })
    }
}

/// Convert a major unit amount into minor units of the store currency.
fn to_minor(id: &str, field: &'static str, value: Decimal) -> Result<i64, ProductRecordError> {
    let scale = Decimal::from(10_i64.pow(currency().exponent));

    value
        .checked_mul(scale)
        .filter(|minor| !minor.is_sign_negative())
        .and_then(|minor| minor.round_dp(0).to_i64())
        .ok_or_else(|| ProductRecordError::InvalidPrice {
            id: id.to_string(),
            field,
            value,
        })
}
