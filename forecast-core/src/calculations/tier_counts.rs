//! Parcel counts per tier for policies that keep the published tier edges.
//!
//! Counting only makes sense against the handout's own edges, so the whole
//! request is refused unless every tracked class is present with exactly the
//! published thresholds.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::calculations::common::format_currency;
use crate::calculations::net_value::{AssessedParcel, assess};
use crate::calculations::tax_engine::TierSchedule;
use crate::models::{
    ClassTierCounts, ParcelRecord, Policy, ReferenceData, TaxClass, TierCountResponse,
    TierCountRow,
};

fn list(thresholds: &[Decimal]) -> String {
    let formatted: Vec<String> = thresholds.iter().copied().map(format_currency).collect();
    format!("[{}]", formatted.join(", "))
}

/// Why a tier-count request was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TierCountRefusal {
    #[error("policy does not include tiered class {0}")]
    MissingClass(TaxClass),

    #[error("tier thresholds for {class} {} do not match the published schedule {}", list(.submitted), list(.expected))]
    ThresholdMismatch {
        class: TaxClass,
        submitted: Vec<Decimal>,
        expected: Vec<Decimal>,
    },
}

/// Checks every tracked class in `reference` against `policy`.
pub fn validate_thresholds(
    policy: &Policy,
    reference: &ReferenceData,
) -> Result<(), TierCountRefusal> {
    for (class, schedule) in reference.tier_schedules() {
        let class_policy = policy
            .get(*class)
            .ok_or(TierCountRefusal::MissingClass(*class))?;
        let submitted = class_policy.schedule.thresholds();
        if submitted != schedule.thresholds() {
            return Err(TierCountRefusal::ThresholdMismatch {
                class: *class,
                submitted,
                expected: schedule.thresholds().to_vec(),
            });
        }
    }
    Ok(())
}

/// Buckets each tracked class's parcels into its published tiers.
pub fn count_tiers(
    parcels: &[AssessedParcel],
    reference: &ReferenceData,
) -> BTreeMap<TaxClass, ClassTierCounts> {
    reference
        .tier_schedules()
        .map(|(class, published)| {
            let schedule = TierSchedule::from_thresholds(published.thresholds());
            let mut counts = vec![0u64; schedule.brackets().len()];
            let mut data_parcel_count = 0;

            for parcel in parcels.iter().filter(|p| p.class_code == class.code()) {
                data_parcel_count += 1;
                if let Some(tier) = schedule.bucket(parcel.net_taxable_value) {
                    counts[tier] += 1;
                }
            }

            let tiers = schedule
                .brackets()
                .iter()
                .zip(counts)
                .enumerate()
                .map(|(i, (bracket, data_count))| TierCountRow {
                    label: bracket.label(i + 1),
                    lower_bound: bracket.lower,
                    upper_bound: bracket.upper,
                    data_count,
                    handout_count: published.handout_count(i),
                })
                .collect();

            (
                *class,
                ClassTierCounts {
                    data_parcel_count,
                    tiers,
                },
            )
        })
        .collect()
}

/// Validates `policy` and, when it keeps the published edges, counts parcels
/// per tier. A refusal carries its reason and no counts.
pub fn tier_counts(
    records: &[ParcelRecord],
    policy: &Policy,
    reference: &ReferenceData,
) -> TierCountResponse {
    if let Err(refusal) = validate_thresholds(policy, reference) {
        info!(%refusal, "tier count request refused");
        return TierCountResponse::refused(refusal.to_string());
    }

    let roll = assess(records);
    TierCountResponse::allowed(count_tiers(&roll.parcels, reference))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{RateSchedule, ReferenceSchedule, TierSpec};

    fn reference() -> ReferenceData {
        let mut schedules = BTreeMap::new();
        schedules.insert(
            TaxClass::OwnerOccupied,
            ReferenceSchedule::new(vec![dec!(1300000), dec!(4500000)], Some(vec![20, 5, 1]))
                .unwrap(),
        );
        ReferenceData::new(
            BTreeMap::new(),
            schedules,
            Default::default(),
            Default::default(),
        )
    }

    fn owner_occupied_policy(edges: &[Option<Decimal>]) -> Policy {
        let mut policy = Policy::default();
        policy.insert(
            TaxClass::OwnerOccupied,
            RateSchedule::Tiered(
                edges
                    .iter()
                    .map(|edge| TierSpec {
                        upper_bound: *edge,
                        rate: dec!(2),
                    })
                    .collect(),
            ),
        );
        policy
    }

    fn record(
        code: u16,
        value: Decimal,
    ) -> ParcelRecord {
        ParcelRecord::new(code, value, dec!(0), dec!(0), dec!(0))
    }

    #[test]
    fn matching_thresholds_in_any_order_are_allowed() {
        let policy =
            owner_occupied_policy(&[None, Some(dec!(4500000)), Some(dec!(1300000.00))]);

        assert_eq!(validate_thresholds(&policy, &reference()), Ok(()));
    }

    #[test]
    fn missing_tracked_class_is_refused() {
        let response = tier_counts(&[], &Policy::default(), &reference());

        assert!(!response.allowed);
        assert_eq!(
            response.reason.as_deref(),
            Some("policy does not include tiered class OWNER-OCCUPIED")
        );
        assert!(response.classes.is_none());
    }

    #[test]
    fn changed_threshold_is_refused_with_both_lists() {
        let policy = owner_occupied_policy(&[Some(dec!(1000000)), Some(dec!(4500000)), None]);

        let response = tier_counts(&[], &policy, &reference());

        assert!(!response.allowed);
        assert_eq!(
            response.reason.as_deref(),
            Some(
                "tier thresholds for OWNER-OCCUPIED [$1,000,000, $4,500,000] do not match \
                 the published schedule [$1,300,000, $4,500,000]"
            )
        );
    }

    #[test]
    fn flat_policy_for_tracked_class_is_refused() {
        let mut policy = Policy::default();
        policy.insert(TaxClass::OwnerOccupied, RateSchedule::Flat(dec!(2)));

        assert!(matches!(
            validate_thresholds(&policy, &reference()),
            Err(TierCountRefusal::ThresholdMismatch { .. })
        ));
    }

    #[test]
    fn counts_use_lower_tier_at_edges() {
        let policy = owner_occupied_policy(&[Some(dec!(1300000)), Some(dec!(4500000)), None]);
        let records = vec![
            record(9, dec!(1300000)),
            record(9, dec!(1300001)),
            record(9, dec!(4500000)),
            record(9, dec!(9000000)),
            record(9, dec!(500)),
            record(3, dec!(9000000)),
            record(9, dec!(0)),
        ];

        let response = tier_counts(&records, &policy, &reference());

        assert!(response.allowed);
        let counts = &response.classes.unwrap()[&TaxClass::OwnerOccupied];
        // The zero-value parcel is disaster-excluded.
        assert_eq!(counts.data_parcel_count, 5);
        let data: Vec<u64> = counts.tiers.iter().map(|t| t.data_count).collect();
        assert_eq!(data, vec![2, 2, 1]);
        let handout: Vec<Option<u64>> = counts.tiers.iter().map(|t| t.handout_count).collect();
        assert_eq!(handout, vec![Some(20), Some(5), Some(1)]);
        assert_eq!(counts.tiers[1].label, "Tier 2: $1,300,001 to $4,500,000");
    }
}
