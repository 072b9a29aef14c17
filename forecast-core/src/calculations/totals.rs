use std::collections::BTreeMap;

use crate::calculations::ForecastError;
use crate::calculations::common::checked_add;
use crate::models::{ClassResult, TaxClass};

/// Sums adjusted class results into the totals row. The totals row never
/// carries a tier breakdown.
pub fn roll_up(results: &BTreeMap<TaxClass, ClassResult>) -> Result<ClassResult, ForecastError> {
    results
        .values()
        .try_fold(ClassResult::default(), |mut totals, result| {
            totals.certified_value =
                checked_add(totals.certified_value, result.certified_value, "total value")?;
            totals.certified_revenue =
                checked_add(totals.certified_revenue, result.certified_revenue, "total revenue")?;
            totals.parcel_count += result.parcel_count;
            totals.exemption_count += result.exemption_count;
            Ok(totals)
        })
}
