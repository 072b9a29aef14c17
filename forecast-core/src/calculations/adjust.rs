//! Class-level adjustments applied after aggregation, in order:
//! exemption averaging, then appeal deductions.
//!
//! Both passes scale revenue proportionally. When a class carries a tier
//! breakdown, each row is scaled and the class revenue is re-derived as the
//! sum of the rows, so the breakdown always partitions the revenue exactly.

use rust_decimal::Decimal;

use crate::calculations::ForecastError;
use crate::calculations::common::{checked_div, checked_mul, checked_sub, checked_sum};
use crate::models::ClassResult;

/// Share of an appeal's dollar amount expected to be granted.
pub const APPEAL_ALLOWANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

fn scale_revenue(
    result: &mut ClassResult,
    factor: Decimal,
) -> Result<(), ForecastError> {
    match result.tier_breakdown.as_mut() {
        Some(rows) => {
            for row in rows.iter_mut() {
                row.revenue = checked_mul(row.revenue, factor, "tier revenue scaling")?;
            }
            result.certified_revenue =
                checked_sum(rows.iter().map(|row| row.revenue), "tier revenue total")?;
        }
        None => {
            result.certified_revenue =
                checked_mul(result.certified_revenue, factor, "revenue scaling")?;
        }
    }
    Ok(())
}

/// Fraction of a class's parcels assumed to pay: `(count - exempt) / count`.
/// One when the class has no parcels.
pub fn exemption_factor(result: &ClassResult) -> Result<Decimal, ForecastError> {
    if result.parcel_count == 0 {
        return Ok(Decimal::ONE);
    }
    let paying = result.parcel_count.saturating_sub(result.exemption_count);
    checked_div(
        Decimal::from(paying),
        Decimal::from(result.parcel_count),
        "exemption factor",
    )
}

/// Scales value, revenue and tier rows by [`exemption_factor`].
pub fn apply_exemption_average(result: &mut ClassResult) -> Result<(), ForecastError> {
    let factor = exemption_factor(result)?;
    if factor == Decimal::ONE {
        return Ok(());
    }
    result.certified_value = checked_mul(result.certified_value, factor, "value scaling")?;
    scale_revenue(result, factor)
}

/// Deducts half of `appeal_value` from the certified value (never below
/// zero) and scales revenue by the same proportion.
///
/// Classes with no value or no positive appeal pass through unchanged.
pub fn apply_appeal(
    result: &mut ClassResult,
    appeal_value: Decimal,
) -> Result<(), ForecastError> {
    let original = result.certified_value;
    if original <= Decimal::ZERO || appeal_value <= Decimal::ZERO {
        return Ok(());
    }

    let deduction = checked_mul(appeal_value, APPEAL_ALLOWANCE, "appeal deduction")?.min(original);
    let adjusted = checked_sub(original, deduction, "appeal adjusted value")?;
    let factor = checked_div(adjusted, original, "appeal reduction factor")?;

    result.certified_value = adjusted;
    scale_revenue(result, factor)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::TierRevenueRow;

    fn row(revenue: Decimal) -> TierRevenueRow {
        TierRevenueRow {
            label: "Tier".to_string(),
            lower_bound: Some(Decimal::ZERO),
            upper_bound: None,
            rate: dec!(1),
            revenue,
        }
    }

    fn tiered_result() -> ClassResult {
        ClassResult {
            certified_value: dec!(1000000),
            certified_revenue: dec!(3000),
            parcel_count: 100,
            exemption_count: 10,
            tier_breakdown: Some(vec![row(dec!(1000)), row(dec!(2000))]),
        }
    }

    fn breakdown_total(result: &ClassResult) -> Decimal {
        result
            .tier_breakdown
            .as_ref()
            .map(|rows| rows.iter().map(|r| r.revenue).sum())
            .unwrap_or_default()
    }

    #[test]
    fn allowance_is_one_half() {
        assert_eq!(APPEAL_ALLOWANCE, dec!(0.5));
    }

    // =========================================================================
    // exemption averaging
    // =========================================================================

    #[test]
    fn exemption_average_scales_by_paying_share() {
        let mut result = tiered_result();

        apply_exemption_average(&mut result).unwrap();

        assert_eq!(result.certified_value, dec!(900000));
        assert_eq!(result.certified_revenue, dec!(2700));
        assert_eq!(breakdown_total(&result), result.certified_revenue);
        assert_eq!(result.parcel_count, 100);
        assert_eq!(result.exemption_count, 10);
    }

    #[test]
    fn exemption_average_is_noop_without_exemptions() {
        let mut result = ClassResult {
            exemption_count: 0,
            ..tiered_result()
        };

        apply_exemption_average(&mut result).unwrap();

        assert_eq!(result, ClassResult {
            exemption_count: 0,
            ..tiered_result()
        });
    }

    #[test]
    fn exemption_factor_is_one_for_empty_class() {
        let result = ClassResult::default();

        assert_eq!(exemption_factor(&result).unwrap(), Decimal::ONE);
    }

    #[test]
    fn exemption_average_keeps_partition_with_repeating_factor() {
        let mut result = ClassResult {
            certified_value: dec!(100),
            certified_revenue: dec!(3),
            parcel_count: 3,
            exemption_count: 1,
            tier_breakdown: Some(vec![row(dec!(1)), row(dec!(1)), row(dec!(1))]),
        };

        apply_exemption_average(&mut result).unwrap();

        assert_eq!(breakdown_total(&result), result.certified_revenue);
    }

    // =========================================================================
    // appeals
    // =========================================================================

    #[test]
    fn appeal_deducts_half_and_scales_revenue() {
        let mut result = ClassResult {
            certified_value: dec!(1000000),
            certified_revenue: dec!(5000),
            parcel_count: 10,
            exemption_count: 0,
            tier_breakdown: None,
        };

        apply_appeal(&mut result, dec!(200000)).unwrap();

        assert_eq!(result.certified_value, dec!(900000));
        assert_eq!(result.certified_revenue, dec!(4500));
    }

    #[test]
    fn appeal_deduction_is_capped_at_value() {
        let mut result = tiered_result();

        apply_appeal(&mut result, dec!(5000000)).unwrap();

        assert_eq!(result.certified_value, Decimal::ZERO);
        assert_eq!(result.certified_revenue, Decimal::ZERO);
        assert_eq!(breakdown_total(&result), Decimal::ZERO);
    }

    #[test]
    fn appeal_scales_tier_rows_with_revenue() {
        let mut result = tiered_result();

        apply_appeal(&mut result, dec!(200000)).unwrap();

        let rows = result.tier_breakdown.as_ref().unwrap();
        assert_eq!(rows[0].revenue, dec!(900));
        assert_eq!(rows[1].revenue, dec!(1800));
        assert_eq!(result.certified_revenue, dec!(2700));
    }

    #[test]
    fn zero_or_negative_appeal_passes_through() {
        for appeal in [Decimal::ZERO, dec!(-100)] {
            let mut result = tiered_result();

            apply_appeal(&mut result, appeal).unwrap();

            assert_eq!(result, tiered_result());
        }
    }

    #[test]
    fn appeal_on_zero_value_class_passes_through() {
        let mut result = ClassResult::default();

        apply_appeal(&mut result, dec!(100)).unwrap();

        assert_eq!(result, ClassResult::default());
    }
}
