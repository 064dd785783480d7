use chrono::NaiveDate;
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

use super::{cart::CartLine, fees::FeeQuote};

/// Flat sales tax applied to the cart subtotal.
pub const TAX_RATE: Decimal = dec!(0.10);

/// Exclusive upper bound of the random invoice suffix.
const INVOICE_SUFFIX_BOUND: u32 = 99_999;

/// Rounds to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub invoice_number: String,
}

/// `INV-<YYYYMMDD>-<5 digit suffix>`. Uniqueness is enforced by storage.
pub fn generate_invoice_number<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> String {
    format!(
        "INV-{}-{:05}",
        date.format("%Y%m%d"),
        rng.gen_range(0..INVOICE_SUFFIX_BOUND)
    )
}

/// Prices a cart snapshot. Pure apart from the invoice suffix drawn from `rng`.
pub fn compute_totals<R: Rng + ?Sized>(
    lines: &[CartLine],
    fees: &FeeQuote,
    date: NaiveDate,
    rng: &mut R,
) -> CheckoutTotals {
    let subtotal: Decimal = lines.iter().map(|line| line.subtotal).sum();
    let raw_tax = subtotal * TAX_RATE;

    CheckoutTotals {
        subtotal: round_money(subtotal),
        tax: round_money(raw_tax),
        total: round_money(subtotal + raw_tax + fees.total()),
        invoice_number: generate_invoice_number(date, rng),
    }
}
