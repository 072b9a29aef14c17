//! Groups taxed parcels by class and joins the handout parcel counts.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::calculations::ForecastError;
use crate::calculations::common::checked_add;
use crate::calculations::net_value::AssessedParcel;
use crate::calculations::tax_engine::TaxedRoll;
use crate::models::{ClassResult, ExemptionEstimate, Policy, ReferenceData, TaxClass};

#[derive(Debug, Default)]
struct ClassTally {
    parcel_count: u64,
    certified_value: Decimal,
    certified_revenue: Decimal,
}

/// Parcels observed beyond the handout's expected count are assumed exempt.
pub fn exemption_count(
    data_parcel_count: u64,
    reference_parcel_count: u64,
) -> u64 {
    data_parcel_count.saturating_sub(reference_parcel_count)
}

/// Builds one unadjusted [`ClassResult`] per policy class that has parcels.
///
/// Parcels whose code maps to no class, or to a class the policy does not
/// name, are dropped: only requested classes are reported.
pub fn aggregate(
    roll: TaxedRoll,
    policy: &Policy,
    reference: &ReferenceData,
) -> Result<BTreeMap<TaxClass, ClassResult>, ForecastError> {
    let TaxedRoll {
        parcels,
        mut tier_revenue,
    } = roll;

    let mut tallies: BTreeMap<TaxClass, ClassTally> = BTreeMap::new();
    for parcel in &parcels {
        let Some(class) = TaxClass::from_code(parcel.class_code) else {
            continue;
        };
        if !policy.contains(class) {
            continue;
        }
        let tally = tallies.entry(class).or_default();
        tally.parcel_count += 1;
        tally.certified_value =
            checked_add(tally.certified_value, parcel.net_taxable_value, "certified value")
                .map_err(|e| e.in_class(class))?;
        tally.certified_revenue =
            checked_add(tally.certified_revenue, parcel.tax, "certified revenue")
                .map_err(|e| e.in_class(class))?;
    }

    Ok(tallies
        .into_iter()
        .map(|(class, tally)| {
            let result = ClassResult {
                certified_value: tally.certified_value,
                certified_revenue: tally.certified_revenue,
                parcel_count: tally.parcel_count,
                exemption_count: exemption_count(
                    tally.parcel_count,
                    reference.parcel_count(class),
                ),
                tier_breakdown: tier_revenue.remove(&class),
            };
            (class, result)
        })
        .collect())
}

/// Observed vs. expected parcel counts for every class in the table,
/// regardless of policy.
pub fn exemption_estimates(
    parcels: &[AssessedParcel],
    reference: &ReferenceData,
) -> BTreeMap<TaxClass, ExemptionEstimate> {
    let mut observed: BTreeMap<u16, u64> = BTreeMap::new();
    for parcel in parcels {
        *observed.entry(parcel.class_code).or_default() += 1;
    }

    TaxClass::all()
        .iter()
        .map(|class| {
            let data_parcel_count = observed.get(&class.code()).copied().unwrap_or(0);
            let reference_parcel_count = reference.parcel_count(*class);
            let estimate = ExemptionEstimate {
                data_parcel_count,
                reference_parcel_count,
                exemption_count: exemption_count(data_parcel_count, reference_parcel_count),
            };
            (*class, estimate)
        })
        .collect()
}
