//! Cart limits and pricing constants.
//!
//! Amounts are expressed in minor units of the store currency (paise for INR).

use rust_decimal::Decimal;
use rusty_money::iso::{self, Currency};

/// Maximum total quantity across all lines, checked when items are added.
pub const MAX_ITEMS: u32 = 50;

/// Maximum quantity of a single `(product, size)` line.
pub const MAX_QUANTITY_PER_ITEM: u32 = 10;

/// Flat tax rate applied to the subtotal (18% GST).
pub const TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Subtotal at or above which shipping is free (₹1,000.00).
pub const FREE_SHIPPING_THRESHOLD: i64 = 1_000_00;

/// Shipping charged below the free shipping threshold (₹99.00).
pub const SHIPPING_FLAT: i64 = 99_00;

/// The single currency every cart is priced in.
pub fn currency() -> &'static Currency {
    iso::INR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_rate_is_eighteen_percent() {
        assert_eq!(TAX_RATE, Decimal::new(18, 2));
    }

    #[test]
    fn thresholds_are_whole_rupees() {
        let minor_per_major = 10_i64.pow(currency().exponent);

        assert_eq!(FREE_SHIPPING_THRESHOLD / minor_per_major, 1_000);
        assert_eq!(SHIPPING_FLAT / minor_per_major, 99);
    }
}
