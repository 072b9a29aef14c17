use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AppealsPayload, ComparisonData, PolicyPayload, TaxClass};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub policy: PolicyPayload,
    #[serde(default)]
    pub appeals: AppealsPayload,
    #[serde(rename = "applyExemptionAverage", default)]
    pub apply_exemption_average: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCountRequest {
    pub policy: PolicyPayload,
}

// ---------------------------------------------------------------------------
// Forecast response
// ---------------------------------------------------------------------------

/// Revenue attributed to one tier of a class (or the single flat-rate row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRevenueRow {
    pub label: String,
    pub lower_bound: Option<Decimal>,
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassResult {
    pub certified_value: Decimal,
    pub certified_revenue: Decimal,
    pub parcel_count: u64,
    pub exemption_count: u64,
    /// Partition of `certified_revenue` by tier. Absent on totals and on
    /// classes with no rate configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_breakdown: Option<Vec<TierRevenueRow>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub results_by_class: BTreeMap<TaxClass, ClassResult>,
    pub totals: ClassResult,
    pub comparison_data: ComparisonData,
}

// ---------------------------------------------------------------------------
// Tier-count response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCountRow {
    pub label: String,
    pub lower_bound: Decimal,
    pub upper_bound: Option<Decimal>,
    pub data_count: u64,
    pub handout_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTierCounts {
    pub data_parcel_count: u64,
    pub tiers: Vec<TierCountRow>,
}

/// Outcome of a tier-count request. A refusal is a normal response with
/// `allowed == false`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCountResponse {
    pub allowed: bool,
    pub reason: Option<String>,
    pub classes: Option<BTreeMap<TaxClass, ClassTierCounts>>,
}

impl TierCountResponse {
    pub fn allowed(classes: BTreeMap<TaxClass, ClassTierCounts>) -> Self {
        Self {
            allowed: true,
            reason: None,
            classes: Some(classes),
        }
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            classes: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Appeals and exemptions summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptionEstimate {
    pub data_parcel_count: u64,
    pub reference_parcel_count: u64,
    pub exemption_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealsAndExemptions {
    pub appeals: BTreeMap<TaxClass, Decimal>,
    pub exemptions: BTreeMap<TaxClass, ExemptionEstimate>,
}

// ---------------------------------------------------------------------------
// Multi-class behaviour
// ---------------------------------------------------------------------------

/// Key under which blank multi-class flags are counted.
pub const FLAG_NOT_SET: &str = "NULL (Not Set)";

/// Occurrences of each `MULTIPLE_CLASS_FLAG` value in one file.
pub type FlagCounts = BTreeMap<String, u64>;

/// Flag counts per source file; a file that was not loaded is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiClassFlagCounts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pardat: Option<FlagCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lndar: Option<FlagCounts>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiClassDataSources {
    pub pardat_flag: String,
    pub lndar_flag: String,
    pub rate_class: String,
}

/// How parcels flagged with more than one land class are billed, with the
/// flag counts observed in the loaded files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiClassBehavior {
    pub strategy: String,
    pub description: String,
    pub data_sources: MultiClassDataSources,
    pub counts: MultiClassFlagCounts,
    pub notes: Vec<String>,
}

impl MultiClassBehavior {
    pub fn with_counts(counts: MultiClassFlagCounts) -> Self {
        Self {
            counts,
            ..Self::default()
        }
    }
}

impl Default for MultiClassBehavior {
    fn default() -> Self {
        Self {
            strategy: "ignore_flag_use_tax_rate_class".to_string(),
            description: "Parcels with MULTIPLE_CLASS_FLAG = 'X' are not apportioned across \
                          classes. Revenue is computed solely from fullasmt25.TAX_RATE_CLASS \
                          using the provided tiers and rates."
                .to_string(),
            data_sources: MultiClassDataSources {
                pardat_flag: "fullpardat25.MULTIPLE_CLASS_FLAG".to_string(),
                lndar_flag: "fulllndarclass25.MULTIPLE_CLASS_FLAG".to_string(),
                rate_class: "fullasmt25.TAX_RATE_CLASS".to_string(),
            },
            counts: MultiClassFlagCounts::default(),
            notes: vec![
                "MULTIPLE_CLASS_FLAG indicates multiple land classes on record, not the \
                 billable tax class."
                    .to_string(),
                "TAX_RATE_CLASS encodes the class actually used for billing (e.g. an \
                 owner-occupied override)."
                    .to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn request_reads_camel_case_flag() {
        let json = r#"{
            "policy": {"APARTMENT": {"code": 2, "rate": 3.5, "tiers": []}},
            "appeals": {"APARTMENT": 1000},
            "applyExemptionAverage": true
        }"#;

        let request: ForecastRequest = serde_json::from_str(json).unwrap();

        assert!(request.apply_exemption_average);
        assert_eq!(request.appeals["APARTMENT"], dec!(1000));
        assert_eq!(request.policy["APARTMENT"].rate, Some(dec!(3.5)));
    }

    #[test]
    fn request_defaults_appeals_and_flag() {
        let request: ForecastRequest = serde_json::from_str(r#"{"policy": {}}"#).unwrap();

        assert!(request.appeals.is_empty());
        assert!(!request.apply_exemption_average);
    }

    #[test]
    fn totals_row_omits_tier_breakdown() {
        let json = serde_json::to_value(ClassResult::default()).unwrap();

        assert!(json.get("tier_breakdown").is_none());
        assert_eq!(json["parcel_count"], 0);
    }

    #[test]
    fn refusal_has_reason_and_no_classes() {
        let response = TierCountResponse::refused("missing OWNER-OCCUPIED");

        assert!(!response.allowed);
        assert_eq!(response.reason.as_deref(), Some("missing OWNER-OCCUPIED"));
        assert!(response.classes.is_none());
    }

    #[test]
    fn multiclass_counts_omit_files_not_loaded() {
        let mut pardat = FlagCounts::new();
        pardat.insert("X".to_string(), 2);
        pardat.insert(FLAG_NOT_SET.to_string(), 5);
        let behavior = MultiClassBehavior::with_counts(MultiClassFlagCounts {
            pardat: Some(pardat),
            lndar: None,
        });

        let json = serde_json::to_value(&behavior).unwrap();

        assert_eq!(json["counts"]["pardat"]["X"], 2);
        assert_eq!(json["counts"]["pardat"]["NULL (Not Set)"], 5);
        assert!(json["counts"].get("lndar").is_none());
        assert_eq!(json["data_sources"]["rate_class"], "fullasmt25.TAX_RATE_CLASS");
        assert_eq!(json["notes"].as_array().map(Vec::len), Some(2));
    }
}
