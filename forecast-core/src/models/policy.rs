//! Tax policy: the wire payload a caller submits and the validated form the
//! engine runs on.
//!
//! The payload mirrors what the budget office edits (class name → code, an
//! optional flat rate, and a tier list). [`Policy::from_payload`] turns it
//! into a map of [`TaxClass`] → [`ClassPolicy`], rejecting shapes the engine
//! cannot interpret unambiguously.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::TaxClass;

/// Errors raised while validating a policy or appeal payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("unknown tax class '{0}'")]
    UnknownClass(String),

    #[error("class {class} must use code {expected}, got {actual}")]
    CodeMismatch {
        class: TaxClass,
        expected: u16,
        actual: u16,
    },

    #[error("class {class} has a negative rate {rate}")]
    NegativeRate { class: TaxClass, rate: Decimal },

    #[error("class {class} has {count} unbounded tiers; at most one is allowed")]
    MultipleUnboundedTiers { class: TaxClass, count: usize },
}

// ---------------------------------------------------------------------------
// Wire payload
// ---------------------------------------------------------------------------

/// One tier as submitted. `up_to: null` marks the open-ended top tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPayload {
    #[serde(alias = "upper_bound")]
    pub up_to: Option<Decimal>,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPolicyPayload {
    pub code: u16,
    /// Flat per-mille rate.
    #[serde(alias = "flat_rate", default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub tiers: Vec<TierPayload>,
}

/// Class name → class policy, exactly as a caller sends it.
pub type PolicyPayload = BTreeMap<String, ClassPolicyPayload>;

/// Class name → appeal dollars, exactly as a caller sends it.
pub type AppealsPayload = BTreeMap<String, Decimal>;

// ---------------------------------------------------------------------------
// Validated policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierSpec {
    /// Inclusive upper edge of the tier; `None` is unbounded.
    pub upper_bound: Option<Decimal>,
    /// Per-mille marginal rate.
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateSchedule {
    /// Per-mille rate applied to the whole net taxable value.
    Flat(Decimal),
    /// Marginal tiers, in the order the caller supplied them.
    Tiered(Vec<TierSpec>),
    /// Neither a rate nor tiers; the class owes nothing.
    Unset,
}

impl RateSchedule {
    /// Bounded tier edges in ascending order. Empty for flat and unset schedules.
    pub fn thresholds(&self) -> Vec<Decimal> {
        match self {
            Self::Tiered(tiers) => {
                let mut edges: Vec<Decimal> = tiers.iter().filter_map(|t| t.upper_bound).collect();
                edges.sort();
                edges
            }
            Self::Flat(_) | Self::Unset => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassPolicy {
    pub class: TaxClass,
    pub schedule: RateSchedule,
}

impl ClassPolicy {
    fn from_payload(
        class: TaxClass,
        payload: &ClassPolicyPayload,
    ) -> Result<Self, PolicyError> {
        if payload.code != class.code() {
            return Err(PolicyError::CodeMismatch {
                class,
                expected: class.code(),
                actual: payload.code,
            });
        }

        let negative = payload
            .rate
            .iter()
            .chain(payload.tiers.iter().map(|t| &t.rate))
            .find(|rate| **rate < Decimal::ZERO);
        if let Some(rate) = negative {
            return Err(PolicyError::NegativeRate { class, rate: *rate });
        }

        let unbounded = payload.tiers.iter().filter(|t| t.up_to.is_none()).count();
        if unbounded > 1 {
            return Err(PolicyError::MultipleUnboundedTiers {
                class,
                count: unbounded,
            });
        }

        let schedule = match (payload.rate, payload.tiers.is_empty()) {
            (flat, false) => {
                if let Some(flat) = flat {
                    warn!(%class, %flat, "class has both tiers and a flat rate; using tiers");
                }
                RateSchedule::Tiered(
                    payload
                        .tiers
                        .iter()
                        .map(|t| TierSpec {
                            upper_bound: t.up_to,
                            rate: t.rate,
                        })
                        .collect(),
                )
            }
            (Some(flat), true) => RateSchedule::Flat(flat),
            (None, true) => RateSchedule::Unset,
        };

        Ok(Self { class, schedule })
    }
}

/// A validated policy. Only the classes it names are forecast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    classes: BTreeMap<TaxClass, ClassPolicy>,
}

impl Policy {
    /// Validates a caller-supplied payload.
    ///
    /// # Errors
    ///
    /// Returns the first [`PolicyError`] found, checking classes in name order.
    pub fn from_payload(payload: &PolicyPayload) -> Result<Self, PolicyError> {
        let mut classes = BTreeMap::new();
        for (name, class_payload) in payload {
            let class =
                TaxClass::parse(name).ok_or_else(|| PolicyError::UnknownClass(name.clone()))?;
            classes.insert(class, ClassPolicy::from_payload(class, class_payload)?);
        }
        Ok(Self { classes })
    }

    pub fn insert(
        &mut self,
        class: TaxClass,
        schedule: RateSchedule,
    ) {
        self.classes.insert(class, ClassPolicy { class, schedule });
    }

    pub fn get(
        &self,
        class: TaxClass,
    ) -> Option<&ClassPolicy> {
        self.classes.get(&class)
    }

    pub fn contains(
        &self,
        class: TaxClass,
    ) -> bool {
        self.classes.contains_key(&class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassPolicy> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Pending appeal dollars per class. Absent classes have no appeals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AppealMap(BTreeMap<TaxClass, Decimal>);

impl AppealMap {
    /// Validates a caller-supplied payload. Negative amounts are kept and
    /// later treated as "no appeal".
    pub fn from_payload(payload: &AppealsPayload) -> Result<Self, PolicyError> {
        let mut appeals = BTreeMap::new();
        for (name, amount) in payload {
            let class =
                TaxClass::parse(name).ok_or_else(|| PolicyError::UnknownClass(name.clone()))?;
            if *amount < Decimal::ZERO {
                warn!(%class, %amount, "negative appeal amount ignored");
            }
            appeals.insert(class, *amount);
        }
        Ok(Self(appeals))
    }

    pub fn insert(
        &mut self,
        class: TaxClass,
        amount: Decimal,
    ) {
        self.0.insert(class, amount);
    }

    /// Appeal dollars for `class`, zero when none were filed.
    pub fn amount(
        &self,
        class: TaxClass,
    ) -> Decimal {
        self.0.get(&class).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TaxClass, &Decimal)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
