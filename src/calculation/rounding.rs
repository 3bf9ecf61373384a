//! Money rounding.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a money amount half away from zero to `scale` decimal places.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_money(Decimal::from_str("2.345").unwrap(), 2), Decimal::from_str("2.35").unwrap());
/// assert_eq!(round_money(Decimal::from_str("-2.345").unwrap(), 2), Decimal::from_str("-2.35").unwrap());
/// ```
pub fn round_money(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}
