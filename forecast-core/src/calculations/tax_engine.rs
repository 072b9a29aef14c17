//! Per-parcel tax under a flat or marginal-tier rate schedule.
//!
//! # Tier convention
//!
//! Tiers are sorted by upper bound (unbounded last) and each covers the
//! half-open range `(lower, upper]`: a value exactly on a tier edge is taxed
//! entirely in the lower tier. Every dollar is taxed once, at the rate of the
//! tier it falls in.
//!
//! | Tier | Range                     | Rate (per mille) |
//! |------|---------------------------|------------------|
//! | 1    | $0 – $1,000,000           | 10               |
//! | 2    | over $1,000,000           | 20               |
//!
//! A parcel worth $1,000,001 owes `1,000,000 × 0.010 + 1 × 0.020 = 10,000.02`.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use forecast_core::calculations::TierSchedule;
//! use forecast_core::{TaxClass, TierSpec};
//!
//! let schedule = TierSchedule::from_tiers(
//!     TaxClass::NonOwnerOccupied,
//!     &[
//!         TierSpec { upper_bound: None, rate: dec!(20) },
//!         TierSpec { upper_bound: Some(dec!(1000000)), rate: dec!(10) },
//!     ],
//! );
//!
//! let mut revenue = vec![dec!(0); schedule.brackets().len()];
//! let tax = schedule.accumulate(dec!(1000001), &mut revenue).unwrap();
//!
//! assert_eq!(tax, dec!(10000.02));
//! assert_eq!(revenue, vec![dec!(10000), dec!(0.02)]);
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::warn;

use crate::calculations::ForecastError;
use crate::calculations::common::{checked_add, checked_mul, format_currency, per_mille};
use crate::calculations::net_value::AssessedParcel;
use crate::models::{Policy, RateSchedule, TaxClass, TierRevenueRow, TierSpec};

/// Label used for the single breakdown row of a flat-rate class.
pub const FLAT_RATE_LABEL: &str = "Flat Rate";

/// One effective tier after sorting and discarding malformed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    /// Exclusive lower edge (inclusive of zero for the first tier).
    pub lower: Decimal,
    /// Inclusive upper edge; `None` is unbounded.
    pub upper: Option<Decimal>,
    /// Per-mille marginal rate.
    pub rate: Decimal,
}

impl Bracket {
    /// The part of `value` that falls inside this bracket:
    /// `clamp(value - lower, 0, upper - lower)`.
    pub fn taxable_portion(
        &self,
        value: Decimal,
    ) -> Decimal {
        let above = (value - self.lower).max(Decimal::ZERO);
        match self.upper {
            Some(upper) => above.min(upper - self.lower),
            None => above,
        }
    }

    /// Whether `value` belongs to this bracket when bucketing parcels. Only
    /// the first bracket includes its lower edge.
    pub fn contains(
        &self,
        value: Decimal,
        first: bool,
    ) -> bool {
        let above_lower = if first {
            value >= self.lower
        } else {
            value > self.lower
        };
        above_lower && self.upper.is_none_or(|upper| value <= upper)
    }

    /// Human-readable label for the bracket at 1-based `position`.
    pub fn label(
        &self,
        position: usize,
    ) -> String {
        match (position, self.upper) {
            (1, Some(upper)) => format!("Tier 1: up to {}", format_currency(upper)),
            (1, None) => "Tier 1: all values".to_string(),
            (n, Some(upper)) if self.lower.fract().is_zero() => format!(
                "Tier {n}: {} to {}",
                format_currency(self.lower + Decimal::ONE),
                format_currency(upper)
            ),
            // Whole-dollar starts only hold for whole-dollar edges.
            (n, Some(upper)) => format!(
                "Tier {n}: over {} to {}",
                format_currency(self.lower),
                format_currency(upper)
            ),
            (n, None) => format!("Tier {n}: over {}", format_currency(self.lower)),
        }
    }
}

fn by_upper_bound(
    a: &TierSpec,
    b: &TierSpec,
) -> Ordering {
    match (a.upper_bound, b.upper_bound) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// An ordered, gap-free list of brackets starting at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierSchedule {
    brackets: Vec<Bracket>,
}

impl TierSchedule {
    /// Sorts `tiers` ascending by upper bound and chains them into brackets.
    ///
    /// Tiers whose upper bound does not exceed the running lower bound, and
    /// anything after an unbounded tier, are skipped with a warning.
    pub fn from_tiers(
        class: TaxClass,
        tiers: &[TierSpec],
    ) -> Self {
        let mut sorted = tiers.to_vec();
        sorted.sort_by(by_upper_bound);

        let mut brackets = Vec::with_capacity(sorted.len());
        let mut lower = Decimal::ZERO;
        let mut open_ended = false;

        for tier in sorted {
            if open_ended {
                warn!(%class, rate = %tier.rate, "skipping tier after the unbounded tier");
                continue;
            }
            match tier.upper_bound {
                Some(upper) if upper <= lower => {
                    warn!(
                        %class,
                        %upper,
                        %lower,
                        rate = %tier.rate,
                        "skipping tier with non-positive bracket width"
                    );
                }
                Some(upper) => {
                    brackets.push(Bracket {
                        lower,
                        upper: Some(upper),
                        rate: tier.rate,
                    });
                    lower = upper;
                }
                None => {
                    brackets.push(Bracket {
                        lower,
                        upper: None,
                        rate: tier.rate,
                    });
                    open_ended = true;
                }
            }
        }

        if !open_ended && !brackets.is_empty() {
            warn!(%class, %lower, "tier schedule has no unbounded tier; value above the last edge is untaxed");
        }

        Self { brackets }
    }

    /// Brackets for counting parcels against published edges. Rates are zero.
    pub fn from_thresholds(thresholds: &[Decimal]) -> Self {
        let mut brackets = Vec::with_capacity(thresholds.len() + 1);
        let mut lower = Decimal::ZERO;
        for &upper in thresholds {
            brackets.push(Bracket {
                lower,
                upper: Some(upper),
                rate: Decimal::ZERO,
            });
            lower = upper;
        }
        brackets.push(Bracket {
            lower,
            upper: None,
            rate: Decimal::ZERO,
        });
        Self { brackets }
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    /// Index of the bracket `value` falls into, if any.
    pub fn bucket(
        &self,
        value: Decimal,
    ) -> Option<usize> {
        self.brackets
            .iter()
            .enumerate()
            .position(|(i, bracket)| bracket.contains(value, i == 0))
    }

    /// Computes the marginal tax on `value`, adding each bracket's share into
    /// the matching slot of `revenue`. Returns the parcel's total tax.
    pub fn accumulate(
        &self,
        value: Decimal,
        revenue: &mut [Decimal],
    ) -> Result<Decimal, ForecastError> {
        let mut tax = Decimal::ZERO;
        for (bracket, slot) in self.brackets.iter().zip(revenue.iter_mut()) {
            let portion = bracket.taxable_portion(value);
            if portion.is_zero() {
                continue;
            }
            let tier_tax = checked_mul(portion, per_mille(bracket.rate), "tier tax")?;
            *slot = checked_add(*slot, tier_tax, "tier revenue")?;
            tax = checked_add(tax, tier_tax, "parcel tax")?;
        }
        Ok(tax)
    }

    /// Breakdown rows pairing each bracket with its accumulated revenue.
    pub fn revenue_rows(
        &self,
        revenue: &[Decimal],
    ) -> Vec<TierRevenueRow> {
        self.brackets
            .iter()
            .zip(revenue)
            .enumerate()
            .map(|(i, (bracket, revenue))| TierRevenueRow {
                label: bracket.label(i + 1),
                lower_bound: Some(bracket.lower),
                upper_bound: bracket.upper,
                rate: bracket.rate,
                revenue: *revenue,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
enum ClassSchedule {
    Flat(Decimal),
    Tiered(TierSchedule),
    Unset,
}

/// Tax owed by one parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxedParcel {
    pub class_code: u16,
    pub net_taxable_value: Decimal,
    pub tax: Decimal,
}

/// Every parcel with its tax, plus per-class revenue by tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxedRoll {
    pub parcels: Vec<TaxedParcel>,
    pub tier_revenue: BTreeMap<TaxClass, Vec<TierRevenueRow>>,
}

/// Applies a policy's schedules to assessed parcels.
#[derive(Debug, Clone)]
pub struct TaxEngine {
    schedules: BTreeMap<u16, (TaxClass, ClassSchedule)>,
}

impl TaxEngine {
    pub fn new(policy: &Policy) -> Self {
        let schedules = policy
            .iter()
            .map(|class_policy| {
                let class = class_policy.class;
                let schedule = match &class_policy.schedule {
                    RateSchedule::Flat(rate) => ClassSchedule::Flat(*rate),
                    RateSchedule::Tiered(tiers) => {
                        ClassSchedule::Tiered(TierSchedule::from_tiers(class, tiers))
                    }
                    RateSchedule::Unset => ClassSchedule::Unset,
                };
                (class.code(), (class, schedule))
            })
            .collect();
        Self { schedules }
    }

    /// Taxes every parcel. Parcels of classes outside the policy owe zero.
    ///
    /// Tier revenue is reported only for policy classes with at least one
    /// parcel; classes with no schedule get no breakdown.
    pub fn apply(
        &self,
        parcels: &[AssessedParcel],
    ) -> Result<TaxedRoll, ForecastError> {
        let mut revenue: BTreeMap<u16, Vec<Decimal>> = BTreeMap::new();
        let mut taxed = Vec::with_capacity(parcels.len());

        for parcel in parcels {
            let value = parcel.net_taxable_value;
            let tax = match self.schedules.get(&parcel.class_code) {
                None => Decimal::ZERO,
                Some((class, schedule)) => {
                    let slots = revenue.entry(parcel.class_code).or_insert_with(|| {
                        match schedule {
                            ClassSchedule::Flat(_) => vec![Decimal::ZERO],
                            ClassSchedule::Tiered(tiers) => {
                                vec![Decimal::ZERO; tiers.brackets().len()]
                            }
                            ClassSchedule::Unset => Vec::new(),
                        }
                    });
                    Self::tax_parcel(schedule, value, slots).map_err(|e| e.in_class(*class))?
                }
            };
            taxed.push(TaxedParcel {
                class_code: parcel.class_code,
                net_taxable_value: value,
                tax,
            });
        }

        let mut tier_revenue = BTreeMap::new();
        for (code, slots) in revenue {
            let Some((class, schedule)) = self.schedules.get(&code) else {
                continue;
            };
            let rows = match schedule {
                ClassSchedule::Flat(rate) => vec![TierRevenueRow {
                    label: FLAT_RATE_LABEL.to_string(),
                    lower_bound: None,
                    upper_bound: None,
                    rate: *rate,
                    revenue: slots[0],
                }],
                ClassSchedule::Tiered(tiers) => tiers.revenue_rows(&slots),
                ClassSchedule::Unset => continue,
            };
            tier_revenue.insert(*class, rows);
        }

        Ok(TaxedRoll {
            parcels: taxed,
            tier_revenue,
        })
    }

    fn tax_parcel(
        schedule: &ClassSchedule,
        value: Decimal,
        slots: &mut [Decimal],
    ) -> Result<Decimal, ForecastError> {
        match schedule {
            ClassSchedule::Flat(rate) => {
                let tax = checked_mul(value, per_mille(*rate), "flat tax")?;
                slots[0] = checked_add(slots[0], tax, "flat revenue")?;
                Ok(tax)
            }
            ClassSchedule::Tiered(tiers) => tiers.accumulate(value, slots),
            ClassSchedule::Unset => Ok(Decimal::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn tier(
        upper_bound: Option<Decimal>,
        rate: Decimal,
    ) -> TierSpec {
        TierSpec { upper_bound, rate }
    }

    fn two_tier() -> TierSchedule {
        TierSchedule::from_tiers(
            TaxClass::NonOwnerOccupied,
            &[tier(Some(dec!(1000000)), dec!(10)), tier(None, dec!(20))],
        )
    }

    fn parcel(
        class_code: u16,
        value: Decimal,
    ) -> AssessedParcel {
        AssessedParcel {
            class_code,
            total_assessed_value: value,
            total_exemption: Decimal::ZERO,
            net_taxable_value: value,
        }
    }

    fn tax_of(
        schedule: &TierSchedule,
        value: Decimal,
    ) -> Decimal {
        let mut revenue = vec![Decimal::ZERO; schedule.brackets().len()];
        schedule.accumulate(value, &mut revenue).unwrap()
    }

    // =========================================================================
    // TierSchedule::from_tiers
    // =========================================================================

    #[test]
    fn from_tiers_sorts_by_upper_bound_with_unbounded_last() {
        let schedule = TierSchedule::from_tiers(
            TaxClass::OwnerOccupied,
            &[
                tier(None, dec!(3.25)),
                tier(Some(dec!(4500000)), dec!(2.00)),
                tier(Some(dec!(1300000)), dec!(1.80)),
            ],
        );

        assert_eq!(
            schedule.brackets(),
            &[
                Bracket {
                    lower: dec!(0),
                    upper: Some(dec!(1300000)),
                    rate: dec!(1.80),
                },
                Bracket {
                    lower: dec!(1300000),
                    upper: Some(dec!(4500000)),
                    rate: dec!(2.00),
                },
                Bracket {
                    lower: dec!(4500000),
                    upper: None,
                    rate: dec!(3.25),
                },
            ]
        );
    }

    #[test]
    fn from_tiers_skips_duplicate_edges() {
        let schedule = TierSchedule::from_tiers(
            TaxClass::TvrStrh,
            &[
                tier(Some(dec!(1000000)), dec!(12.5)),
                tier(Some(dec!(1000000)), dec!(99)),
                tier(None, dec!(15)),
            ],
        );

        assert_eq!(schedule.brackets().len(), 2);
        assert_eq!(schedule.brackets()[1].lower, dec!(1000000));
        assert_eq!(schedule.brackets()[1].rate, dec!(15));
    }

    #[test]
    fn from_tiers_skips_non_positive_first_edge() {
        let schedule = TierSchedule::from_tiers(
            TaxClass::TvrStrh,
            &[tier(Some(dec!(0)), dec!(50)), tier(None, dec!(15))],
        );

        assert_eq!(
            schedule.brackets(),
            &[Bracket {
                lower: dec!(0),
                upper: None,
                rate: dec!(15),
            }]
        );
    }

    // =========================================================================
    // Marginal tax
    // =========================================================================

    #[test]
    fn value_on_tier_edge_is_taxed_in_lower_tier() {
        assert_eq!(tax_of(&two_tier(), dec!(1000000)), dec!(10000));
    }

    #[test]
    fn value_one_dollar_past_edge_pays_upper_rate_on_that_dollar() {
        assert_eq!(tax_of(&two_tier(), dec!(1000001)), dec!(10000.02));
    }

    #[test]
    fn zero_value_owes_nothing() {
        assert_eq!(tax_of(&two_tier(), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn three_tier_tax_is_sum_of_bracket_shares() {
        let schedule = TierSchedule::from_tiers(
            TaxClass::NonOwnerOccupied,
            &[
                tier(Some(dec!(1000000)), dec!(5.87)),
                tier(Some(dec!(3000000)), dec!(8.50)),
                tier(None, dec!(14.00)),
            ],
        );
        let mut revenue = vec![Decimal::ZERO; 3];

        let tax = schedule.accumulate(dec!(4000000), &mut revenue).unwrap();

        // 1,000,000 × 0.00587 + 2,000,000 × 0.0085 + 1,000,000 × 0.014
        assert_eq!(revenue, vec![dec!(5870), dec!(17000), dec!(14000)]);
        assert_eq!(tax, dec!(36870));
    }

    #[test]
    fn schedule_without_unbounded_tier_leaves_excess_untaxed() {
        let schedule =
            TierSchedule::from_tiers(TaxClass::Commercial, &[tier(Some(dec!(100)), dec!(10))]);

        assert_eq!(tax_of(&schedule, dec!(500)), dec!(1));
    }

    // =========================================================================
    // Labels and bucketing
    // =========================================================================

    #[test]
    fn labels_describe_inclusive_ranges() {
        let schedule = TierSchedule::from_tiers(
            TaxClass::LongTermRental,
            &[
                tier(Some(dec!(1300000)), dec!(3)),
                tier(Some(dec!(3000000)), dec!(5)),
                tier(None, dec!(8)),
            ],
        );
        let labels: Vec<String> = schedule
            .brackets()
            .iter()
            .enumerate()
            .map(|(i, b)| b.label(i + 1))
            .collect();

        assert_eq!(
            labels,
            vec![
                "Tier 1: up to $1,300,000",
                "Tier 2: $1,300,001 to $3,000,000",
                "Tier 3: over $3,000,000",
            ]
        );
    }

    #[test]
    fn fractional_edge_labels_middle_tier_from_the_edge() {
        let schedule = TierSchedule::from_tiers(
            TaxClass::LongTermRental,
            &[
                tier(Some(dec!(1000000.5)), dec!(3)),
                tier(Some(dec!(2000000)), dec!(5)),
                tier(None, dec!(8)),
            ],
        );
        let labels: Vec<String> = schedule
            .brackets()
            .iter()
            .enumerate()
            .map(|(i, b)| b.label(i + 1))
            .collect();

        assert_eq!(
            labels,
            vec![
                "Tier 1: up to $1,000,000.5",
                "Tier 2: over $1,000,000.5 to $2,000,000",
                "Tier 3: over $2,000,000",
            ]
        );
    }

    #[test]
    fn bucket_places_edges_in_lower_tier_and_zero_in_first() {
        let schedule = TierSchedule::from_thresholds(&[dec!(1000000), dec!(3000000)]);

        assert_eq!(schedule.bucket(dec!(0)), Some(0));
        assert_eq!(schedule.bucket(dec!(1000000)), Some(0));
        assert_eq!(schedule.bucket(dec!(1000000.01)), Some(1));
        assert_eq!(schedule.bucket(dec!(3000000)), Some(1));
        assert_eq!(schedule.bucket(dec!(3000001)), Some(2));
    }

    // =========================================================================
    // TaxEngine
    // =========================================================================

    #[test]
    fn flat_class_reports_single_flat_rate_row() {
        let mut policy = Policy::default();
        policy.insert(TaxClass::Apartment, RateSchedule::Flat(dec!(5.0)));

        let roll = TaxEngine::new(&policy).apply(&[parcel(2, dec!(200000))]).unwrap();

        assert_eq!(roll.parcels[0].tax, dec!(1000));
        assert_eq!(
            roll.tier_revenue[&TaxClass::Apartment],
            vec![TierRevenueRow {
                label: FLAT_RATE_LABEL.to_string(),
                lower_bound: None,
                upper_bound: None,
                rate: dec!(5.0),
                revenue: dec!(1000),
            }]
        );
    }

    #[test]
    fn tier_revenue_sums_to_parcel_taxes() {
        let mut policy = Policy::default();
        policy.insert(
            TaxClass::OwnerOccupied,
            RateSchedule::Tiered(vec![
                tier(Some(dec!(1300000)), dec!(1.80)),
                tier(Some(dec!(4500000)), dec!(2.00)),
                tier(None, dec!(3.25)),
            ]),
        );
        let parcels = [
            parcel(9, dec!(650000)),
            parcel(9, dec!(2100000)),
            parcel(9, dec!(7333333.33)),
        ];

        let roll = TaxEngine::new(&policy).apply(&parcels).unwrap();

        let parcel_total: Decimal = roll.parcels.iter().map(|p| p.tax).sum();
        let tier_total: Decimal = roll.tier_revenue[&TaxClass::OwnerOccupied]
            .iter()
            .map(|row| row.revenue)
            .sum();
        assert_eq!(parcel_total, tier_total);
    }

    #[test]
    fn classes_outside_policy_owe_nothing() {
        let mut policy = Policy::default();
        policy.insert(TaxClass::Apartment, RateSchedule::Flat(dec!(3.5)));

        let roll = TaxEngine::new(&policy).apply(&[parcel(3, dec!(500000))]).unwrap();

        assert_eq!(roll.parcels[0].tax, Decimal::ZERO);
        assert!(roll.tier_revenue.is_empty());
    }

    #[test]
    fn policy_class_without_parcels_has_no_breakdown() {
        let mut policy = Policy::default();
        policy.insert(TaxClass::Apartment, RateSchedule::Flat(dec!(3.5)));
        policy.insert(TaxClass::Industrial, RateSchedule::Flat(dec!(7.05)));

        let roll = TaxEngine::new(&policy).apply(&[parcel(2, dec!(100000))]).unwrap();

        assert!(roll.tier_revenue.contains_key(&TaxClass::Apartment));
        assert!(!roll.tier_revenue.contains_key(&TaxClass::Industrial));
    }

    #[test]
    fn unset_schedule_owes_nothing_and_has_no_breakdown() {
        let mut policy = Policy::default();
        policy.insert(TaxClass::Conservation, RateSchedule::Unset);

        let roll = TaxEngine::new(&policy).apply(&[parcel(6, dec!(100000))]).unwrap();

        assert_eq!(roll.parcels[0].tax, Decimal::ZERO);
        assert!(roll.tier_revenue.is_empty());
    }
}
