//! Decimal prices and discount math.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Display prefix for rupee amounts.
pub const RUPEE_SYMBOL: &str = "₹";

/// A price in Indian rupees, the only currency the catalog uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Price {
    /// Amount in rupees, not paise.
    pub amount: Decimal,
}

impl Price {
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self { amount }
    }

    /// Format for display, e.g. `₹249.00`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{RUPEE_SYMBOL}{rounded:.2}")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Percentage off for a marked-down product.
///
/// Returns `None` unless `original` is strictly greater than `current`.
/// The percentage is `round((original - current) / original * 100)`, with
/// halves rounded up, clamped to `1..=99` so a badge never reads 0% or 100%.
#[must_use]
pub fn discount_percent(original: Decimal, current: Decimal) -> Option<u8> {
    if original <= current || original <= Decimal::ZERO {
        return None;
    }

    let ratio = (original - current) / original * Decimal::ONE_HUNDRED;
    let rounded = ratio.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let percent = rounded.to_u8().unwrap_or(99);

    Some(percent.clamp(1, 99))
}
