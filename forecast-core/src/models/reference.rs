use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{PolicyPayload, TaxClass};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("tier thresholds must be positive and strictly ascending, got {0:?}")]
    UnorderedThresholds(Vec<Decimal>),

    #[error("{thresholds} thresholds need {expected} handout counts, got {actual}")]
    HandoutCountMismatch {
        thresholds: usize,
        expected: usize,
        actual: usize,
    },
}

/// Certified value and revenue for one class in a published fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonFigures {
    pub certified_value: Decimal,
    pub certified_revenue: Decimal,
}

/// Fiscal year label → class name (or `totals`) → figures. Passed through to
/// forecast responses untouched.
pub type ComparisonData = BTreeMap<String, BTreeMap<String, ComparisonFigures>>;

/// Published tier edges for a class, with the handout's per-tier parcel counts
/// when the handout lists them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSchedule {
    thresholds: Vec<Decimal>,
    handout_counts: Option<Vec<u64>>,
}

impl ReferenceSchedule {
    /// `handout_counts`, when present, has one entry per tier: one more than
    /// the number of thresholds.
    pub fn new(
        thresholds: Vec<Decimal>,
        handout_counts: Option<Vec<u64>>,
    ) -> Result<Self, ReferenceError> {
        let ascending = thresholds.windows(2).all(|pair| pair[0] < pair[1]);
        let positive = thresholds.first().is_none_or(|first| *first > Decimal::ZERO);
        if !ascending || !positive {
            return Err(ReferenceError::UnorderedThresholds(thresholds));
        }

        if let Some(counts) = &handout_counts {
            if counts.len() != thresholds.len() + 1 {
                return Err(ReferenceError::HandoutCountMismatch {
                    thresholds: thresholds.len(),
                    expected: thresholds.len() + 1,
                    actual: counts.len(),
                });
            }
        }

        Ok(Self {
            thresholds,
            handout_counts,
        })
    }

    pub fn thresholds(&self) -> &[Decimal] {
        &self.thresholds
    }

    pub fn handout_count(
        &self,
        tier: usize,
    ) -> Option<u64> {
        self.handout_counts
            .as_ref()
            .and_then(|counts| counts.get(tier).copied())
    }
}

/// Static tables the forecast joins against. Built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceData {
    parcel_counts: BTreeMap<TaxClass, u64>,
    tier_schedules: BTreeMap<TaxClass, ReferenceSchedule>,
    comparison: ComparisonData,
    default_policy: PolicyPayload,
}

impl ReferenceData {
    pub fn new(
        parcel_counts: BTreeMap<TaxClass, u64>,
        tier_schedules: BTreeMap<TaxClass, ReferenceSchedule>,
        comparison: ComparisonData,
        default_policy: PolicyPayload,
    ) -> Self {
        Self {
            parcel_counts,
            tier_schedules,
            comparison,
            default_policy,
        }
    }

    /// Expected parcel count for `class` from the budget handout; zero when
    /// the handout does not list the class.
    pub fn parcel_count(
        &self,
        class: TaxClass,
    ) -> u64 {
        self.parcel_counts.get(&class).copied().unwrap_or(0)
    }

    pub fn tier_schedule(
        &self,
        class: TaxClass,
    ) -> Option<&ReferenceSchedule> {
        self.tier_schedules.get(&class)
    }

    /// Classes whose tier edges are published, in code order.
    pub fn tier_schedules(&self) -> impl Iterator<Item = (&TaxClass, &ReferenceSchedule)> {
        self.tier_schedules.iter()
    }

    pub fn comparison(&self) -> &ComparisonData {
        &self.comparison
    }

    pub fn default_policy(&self) -> &PolicyPayload {
        &self.default_policy
    }
}
