//! Prices

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};

use crate::{
    items::LineItem,
    limits::{FREE_SHIPPING_THRESHOLD, SHIPPING_FLAT, TAX_RATE, currency},
};

/// Totals derived from a cart's lines. Never stored, always recomputed.
///
/// Amounts are in minor units of [`currency`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// Sum of `price × quantity` over all lines
    pub subtotal: i64,

    /// Tax on the subtotal, rounded to whole currency units
    pub tax: i64,

    /// Shipping charge
    pub shipping: i64,

    /// `subtotal + tax + shipping`
    pub total: i64,

    /// Sum of quantities over all lines
    pub item_count: u32,

    /// Amount saved against regular prices
    pub savings: i64,
}

impl Totals {
    /// Compute totals for the given lines.
    pub fn from_items(items: &[LineItem]) -> Self {
        let subtotal = subtotal(items);
        let tax = tax_on(subtotal);
        let shipping = shipping_for(subtotal);

        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal.saturating_add(tax).saturating_add(shipping),
            item_count: item_count(items),
            savings: items
                .iter()
                .fold(0_i64, |acc, item| acc.saturating_add(item.savings())),
        }
    }

    /// How much more must be spent before shipping becomes free.
    pub fn amount_to_free_shipping(&self) -> i64 {
        FREE_SHIPPING_THRESHOLD.saturating_sub(self.subtotal).max(0)
    }

    /// Whether the cart ships for free.
    pub fn ships_free(&self) -> bool {
        self.shipping == 0
    }

    /// Savings as a fraction of what the lines would cost at regular prices.
    pub fn savings_percent(&self) -> Percentage {
        let undiscounted = self.subtotal.saturating_add(self.savings);

        if undiscounted == 0 {
            return Percentage::from(Decimal::ZERO);
        }

        Percentage::from(Decimal::from(self.savings) / Decimal::from(undiscounted))
    }

    /// Subtotal as money.
    pub fn subtotal_money(&self) -> Money<'static, Currency> {
        money(self.subtotal)
    }

    /// Tax as money.
    pub fn tax_money(&self) -> Money<'static, Currency> {
        money(self.tax)
    }

    /// Shipping as money.
    pub fn shipping_money(&self) -> Money<'static, Currency> {
        money(self.shipping)
    }

    /// Total as money.
    pub fn total_money(&self) -> Money<'static, Currency> {
        money(self.total)
    }
}

/// Wrap a minor unit amount in the store currency.
pub fn money(minor: i64) -> Money<'static, Currency> {
    Money::from_minor(minor, currency())
}

/// Sum of line totals.
pub fn subtotal(items: &[LineItem]) -> i64 {
    items
        .iter()
        .fold(0_i64, |acc, item| acc.saturating_add(item.line_total()))
}

/// Sum of quantities.
pub fn item_count(items: &[LineItem]) -> u32 {
    items
        .iter()
        .fold(0_u32, |acc, item| acc.saturating_add(item.quantity))
}

/// Tax on a subtotal, rounded half away from zero to whole currency units.
pub fn tax_on(subtotal: i64) -> i64 {
    let minor_per_major = 10_i64.pow(currency().exponent);

    let major = Decimal::from(subtotal) / Decimal::from(minor_per_major);

    let tax_major = (major * TAX_RATE)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or_default();

    tax_major.saturating_mul(minor_per_major)
}

/// Shipping charge for a subtotal.
pub fn shipping_for(subtotal: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        SHIPPING_FLAT
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::products::ProductId;

    fn line(id: &str, price: i64, quantity: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(id),
            name: id.to_string(),
            image: None,
            category: None,
            size: "M".to_string(),
            quantity,
            price,
            original_price: price,
            added_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn subtotal_at_threshold_ships_free() {
        let totals = Totals::from_items(&[line("p1", 500_00, 2)]);

        assert_eq!(totals.subtotal, 1_000_00);
        assert_eq!(totals.shipping, 0);
        assert_eq!(totals.tax, 180_00);
        assert_eq!(totals.total, 1_180_00);
        assert_eq!(totals.item_count, 2);
        assert!(totals.ships_free());
    }

    #[test]
    fn subtotal_below_threshold_pays_flat_shipping() {
        let totals = Totals::from_items(&[line("p1", 500_00, 1)]);

        assert_eq!(totals.shipping, 99_00);
        assert_eq!(totals.tax, 90_00);
        assert_eq!(totals.total, 689_00);
        assert_eq!(totals.amount_to_free_shipping(), 500_00);
    }

    #[test]
    fn tax_rounds_half_away_from_zero() {
        // 199 × 0.18 = 35.82
        assert_eq!(tax_on(199_00), 36_00);
        // 25 × 0.18 = 4.5
        assert_eq!(tax_on(25_00), 5_00);
        // 2 × 0.18 = 0.36
        assert_eq!(tax_on(2_00), 0);
    }

    #[test]
    fn empty_cart_totals() {
        let totals = Totals::from_items(&[]);

        assert_eq!(totals.subtotal, 0);
        assert_eq!(totals.tax, 0);
        assert_eq!(totals.shipping, SHIPPING_FLAT);
        assert_eq!(totals.total, SHIPPING_FLAT);
        assert_eq!(totals.item_count, 0);
        assert_eq!(totals.amount_to_free_shipping(), FREE_SHIPPING_THRESHOLD);
    }

    #[test]
    fn savings_against_regular_price() {
        let mut discounted = line("p1", 199_00, 2);
        discounted.original_price = 499_00;

        let totals = Totals::from_items(&[discounted, line("p2", 100_00, 1)]);

        assert_eq!(totals.savings, 600_00);
        // 600 / (398 + 100 + 600)
        assert_eq!(
            (totals.savings_percent() * Decimal::ONE).round_dp(4),
            Decimal::new(5464, 4)
        );
    }

    #[test]
    fn money_values_use_store_currency() {
        let totals = Totals::from_items(&[line("p1", 500_00, 2)]);

        assert_eq!(totals.total_money(), Money::from_minor(1_180_00, currency()));
        assert_eq!(totals.shipping_money(), Money::from_minor(0, currency()));
    }
}
