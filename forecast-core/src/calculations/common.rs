//! Common utility functions for forecast calculations.
//!
//! Rounding, the per-mille rate convention, overflow-checked arithmetic, and
//! currency formatting shared by the engine and its reports.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::calculations::ForecastError;

/// Property tax rates are quoted in dollars per $1,000 of taxable value.
pub const PER_MILLE: Decimal = Decimal::ONE_THOUSAND;

/// Converts a per-mille rate into a multiplier on taxable value.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use forecast_core::calculations::common::per_mille;
///
/// assert_eq!(per_mille(dec!(5.87)), dec!(0.00587));
/// ```
pub fn per_mille(rate: Decimal) -> Decimal {
    rate / PER_MILLE
}

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use forecast_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub(crate) fn checked_add(
    a: Decimal,
    b: Decimal,
    step: &'static str,
) -> Result<Decimal, ForecastError> {
    a.checked_add(b).ok_or(ForecastError::Overflow(step))
}

pub(crate) fn checked_sub(
    a: Decimal,
    b: Decimal,
    step: &'static str,
) -> Result<Decimal, ForecastError> {
    a.checked_sub(b).ok_or(ForecastError::Overflow(step))
}

pub(crate) fn checked_mul(
    a: Decimal,
    b: Decimal,
    step: &'static str,
) -> Result<Decimal, ForecastError> {
    a.checked_mul(b).ok_or(ForecastError::Overflow(step))
}

pub(crate) fn checked_div(
    a: Decimal,
    b: Decimal,
    step: &'static str,
) -> Result<Decimal, ForecastError> {
    a.checked_div(b).ok_or(ForecastError::Overflow(step))
}

/// Sums amounts in iteration order, failing on overflow.
pub(crate) fn checked_sum<I>(
    amounts: I,
    step: &'static str,
) -> Result<Decimal, ForecastError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| checked_add(total, amount, step))
}

/// Inserts thousands separators into the integer part of a plain decimal string.
fn group_thousands(text: &str) -> String {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(fraction) => format!("{sign}${grouped}.{fraction}"),
        None => format!("{sign}${grouped}"),
    }
}

/// Formats a dollar amount with thousands separators and no trailing zeros,
/// e.g. `$1,300,001`.
pub fn format_currency(value: Decimal) -> String {
    group_thousands(&value.normalize().to_string())
}

/// Formats a dollar amount rounded half-up to cents, e.g. `$10,000.00`.
pub fn format_cents(value: Decimal) -> String {
    group_thousands(&format!("{:.2}", round_half_up(value)))
}
