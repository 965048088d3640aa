//! Receipt

use std::{fmt::Write, io};

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{Money, MoneyError, iso::Currency};
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::Cart,
    items::LineItem,
    limits::TAX_RATE,
    pricing::{Totals, money},
};

/// Errors that can occur when rendering a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Wrapper for money errors.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// IO error
    #[error("IO error")]
    IO,
}

/// Printable summary of a cart: its lines and derived totals.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    items: &'a [LineItem],
    totals: Totals,
}

impl<'a> Receipt<'a> {
    /// Create a receipt for the given lines.
    pub fn new(items: &'a [LineItem]) -> Self {
        Self {
            items,
            totals: Totals::from_items(items),
        }
    }

    /// Create a receipt for a cart.
    pub fn from_cart(cart: &'a Cart) -> Self {
        Self::new(cart.items())
    }

    /// Lines on the receipt
    pub fn items(&self) -> &'a [LineItem] {
        self.items
    }

    /// Derived totals
    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// What the lines would have cost at regular prices.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the addition fails.
    pub fn undiscounted(&self) -> Result<Money<'static, Currency>, MoneyError> {
        self.totals.subtotal_money().add(money(self.totals.savings))
    }

    /// Renders the receipt as a table followed by a summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        if self.items.is_empty() {
            return writeln!(out, "\nYour cart is empty.\n").map_err(|_err| ReceiptError::IO);
        }

        let mut builder = Builder::default();
        let mut color_ops: SmallVec<[(usize, usize, Color); 16]> = SmallVec::new();

        builder.push_record([
            "", "Item", "Size", "Qty", "Price", "Line Total", "Savings",
        ]);

        for (idx, item) in self.items.iter().enumerate() {
            let row = idx + 1;
            let savings = item.savings();

            let price = if item.price < item.original_price {
                color_ops.push((row, 4, Color::FG_GREEN));
                format!("{} (was {})", money(item.price), money(item.original_price))
            } else {
                format!("{}", money(item.price))
            };

            builder.push_record([
                format!("#{:<3}", idx + 1),
                item.name.clone(),
                item.size.clone(),
                item.quantity.to_string(),
                price,
                format!("{}", money(item.line_total())),
                if savings > 0 {
                    format!("-{}", money(savings))
                } else {
                    String::new()
                },
            ]);

            color_ops.push((row, 0, color_dark_grey()));
        }

        write_receipt_table(&mut out, builder, color_ops)?;

        self.write_summary(&mut out)
    }

    fn write_summary(&self, out: &mut impl io::Write) -> Result<(), ReceiptError> {
        let totals = &self.totals;
        let tax_points = percent_points(Percentage::from(TAX_RATE));

        let shipping = if totals.ships_free() {
            "Free  ".to_string()
        } else {
            format!("{}  ", totals.shipping_money())
        };

        let lines = [
            (" Items:".to_string(), format!("{}  ", totals.item_count)),
            (" Subtotal:".to_string(), format!("{}  ", totals.subtotal_money())),
            (format!(" Tax ({tax_points}%):"), format!("{}  ", totals.tax_money())),
            (" Shipping:".to_string(), shipping),
            (
                " \x1b[1mTotal:\x1b[0m".to_string(),
                format!("\x1b[1m{}  \x1b[0m", totals.total_money()),
            ),
        ];

        let label_width = lines
            .iter()
            .map(|(label, _)| visible_width(label))
            .max()
            .unwrap_or_default();

        let value_width = lines
            .iter()
            .map(|(_, value)| visible_width(value))
            .max()
            .unwrap_or_default();

        for (label, value) in &lines {
            write_summary_line(out, label, value, label_width, value_width)?;
        }

        if totals.savings > 0 {
            let savings_points = percent_points(totals.savings_percent());

            writeln!(
                out,
                "\n You save {} ({savings_points}%) against {}",
                money(totals.savings),
                self.undiscounted()?
            )
            .map_err(|_err| ReceiptError::IO)?;
        }

        if !totals.ships_free() {
            writeln!(
                out,
                " Add {} more for free shipping",
                money(totals.amount_to_free_shipping())
            )
            .map_err(|_err| ReceiptError::IO)?;
        }

        writeln!(out).map_err(|_err| ReceiptError::IO)
    }
}

fn write_receipt_table(
    out: &mut impl io::Write,
    builder: Builder,
    color_ops: SmallVec<[(usize, usize, Color); 16]>,
) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(3..7), Alignment::right());

    for (row, col, color) in color_ops {
        table.modify((row, col), color);
    }

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReceiptError::IO)
}

/// Converts a fractional percentage to percent points for display.
fn percent_points(percentage: Percentage) -> Decimal {
    ((percentage * Decimal::ONE) * Decimal::ONE_HUNDRED)
        .round_dp(2)
        .normalize()
}

/// Wraps runs of box-drawing characters in dark grey.
fn colorize_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let box_char = ('\u{2500}'..='\u{257F}').contains(&ch);

        if box_char && !in_run {
            _ = out.write_str("\x1b[90m");
            in_run = true;
        } else if !box_char && in_run {
            _ = out.write_str("\x1b[0m");
            in_run = false;
        }

        out.push(ch);
    }

    if in_run {
        _ = out.write_str("\x1b[0m");
    }

    out
}

/// Returns the visible (non-ANSI) width of a string.
fn visible_width(s: &str) -> usize {
    let mut width = 0usize;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

/// Writes a summary line with a right-aligned label and a fixed-width value column.
fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {}{value}",
        "",
        " ".repeat(value_pad)
    )
    .map_err(|_err| ReceiptError::IO)
}

/// ANSI dark grey foreground.
fn color_dark_grey() -> Color {
    Color::new("\x1b[90m", "\x1b[0m")
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use super::*;
    use crate::products::ProductId;

    fn line(name: &str, price: i64, original_price: i64, quantity: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(name.to_lowercase()),
            name: name.to_string(),
            image: None,
            category: None,
            size: "M".to_string(),
            quantity,
            price,
            original_price,
            added_at: Timestamp::UNIX_EPOCH,
        }
    }

    fn render(receipt: &Receipt<'_>) -> Result<String, Box<dyn std::error::Error>> {
        let mut out = Vec::new();
        receipt.write_to(&mut out)?;

        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn totals_follow_lines() {
        let items = [line("Brief", 199_00, 499_00, 2), line("Trunk", 300_00, 300_00, 1)];
        let receipt = Receipt::new(&items);

        assert_eq!(receipt.totals().subtotal, 698_00);
        assert_eq!(receipt.totals().savings, 600_00);
        assert_eq!(receipt.items().len(), 2);
    }

    #[test]
    fn undiscounted_adds_savings_back() -> TestResult {
        let items = [line("Brief", 199_00, 499_00, 2)];
        let receipt = Receipt::new(&items);

        assert_eq!(receipt.undiscounted()?, money(998_00));

        Ok(())
    }

    #[test]
    fn write_to_renders_lines_and_summary() -> TestResult {
        let items = [line("Brief", 199_00, 499_00, 2), line("Trunk", 300_00, 300_00, 1)];

        let output = render(&Receipt::new(&items))?;

        assert!(output.contains("Brief"), "missing first line: {output}");
        assert!(output.contains("Trunk"), "missing second line: {output}");
        assert!(output.contains("Subtotal:"), "missing subtotal: {output}");
        assert!(output.contains("Tax (18%):"), "missing tax: {output}");
        assert!(output.contains("Total:"), "missing total: {output}");
        assert!(output.contains("You save"), "missing savings: {output}");
        assert!(
            output.contains("more for free shipping"),
            "missing shipping hint: {output}"
        );

        Ok(())
    }

    #[test]
    fn write_to_shows_free_shipping() -> TestResult {
        let items = [line("Trunk", 500_00, 500_00, 2)];

        let output = render(&Receipt::new(&items))?;

        assert!(output.contains("Free"), "shipping should be free: {output}");
        assert!(
            !output.contains("more for free shipping"),
            "no hint expected: {output}"
        );
        assert!(!output.contains("You save"), "no savings expected: {output}");

        Ok(())
    }

    #[test]
    fn write_to_handles_empty_cart() -> TestResult {
        let cart = Cart::new();

        let output = render(&Receipt::from_cart(&cart))?;

        assert!(output.contains("Your cart is empty."), "got: {output}");

        Ok(())
    }

    #[test]
    fn percent_points_from_fraction() {
        assert_eq!(percent_points(Percentage::from(TAX_RATE)), Decimal::from(18));
    }

    #[test]
    fn visible_width_skips_ansi_sequences() {
        assert_eq!(visible_width("\x1b[1mTotal:\x1b[0m"), 6);
    }
}
