//! Reference tables read from TOML: handout parcel counts, published tier
//! edges, the default policy and the comparison figures.
//!
//! The FY 2026 tables ship inside the crate; see [`embedded`].

use std::collections::BTreeMap;
use std::path::Path;

use forecast_core::{
    ComparisonData, Policy, PolicyError, PolicyPayload, ReferenceData, ReferenceError,
    ReferenceSchedule, TaxClass,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

const FY2026: &str = include_str!("../reference/fy2026.toml");

/// Errors that can occur when loading reference tables.
#[derive(Debug, Error)]
pub enum ReferenceLoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unknown tax class '{name}' in [{section}]")]
    UnknownClass { section: &'static str, name: String },

    #[error("tier schedule for {class}: {source}")]
    Schedule {
        class: TaxClass,
        #[source]
        source: ReferenceError,
    },

    #[error("default policy: {0}")]
    DefaultPolicy(#[from] PolicyError),
}

#[derive(Debug, Deserialize)]
struct ScheduleEntry {
    thresholds: Vec<Decimal>,
    #[serde(default)]
    handout_counts: Option<Vec<u64>>,
}

/// Mirrors the TOML layout. Class names are validated after parsing so the
/// error names the offending section.
#[derive(Debug, Deserialize)]
struct ReferenceFile {
    #[serde(default)]
    parcel_counts: BTreeMap<String, u64>,
    #[serde(default)]
    tier_schedules: BTreeMap<String, ScheduleEntry>,
    #[serde(default)]
    default_policy: PolicyPayload,
    #[serde(default)]
    comparison: ComparisonData,
}

fn class_named(
    section: &'static str,
    name: &str,
) -> Result<TaxClass, ReferenceLoaderError> {
    TaxClass::parse(name).ok_or_else(|| ReferenceLoaderError::UnknownClass {
        section,
        name: name.to_string(),
    })
}

impl ReferenceFile {
    fn into_reference(self) -> Result<ReferenceData, ReferenceLoaderError> {
        let parcel_counts = self
            .parcel_counts
            .iter()
            .map(|(name, count)| Ok((class_named("parcel_counts", name)?, *count)))
            .collect::<Result<BTreeMap<_, _>, ReferenceLoaderError>>()?;

        let tier_schedules = self
            .tier_schedules
            .into_iter()
            .map(|(name, entry)| {
                let class = class_named("tier_schedules", &name)?;
                let schedule = ReferenceSchedule::new(entry.thresholds, entry.handout_counts)
                    .map_err(|source| ReferenceLoaderError::Schedule { class, source })?;
                Ok((class, schedule))
            })
            .collect::<Result<BTreeMap<_, _>, ReferenceLoaderError>>()?;

        // Served as-is to clients, so it must pass the same checks as a request.
        Policy::from_payload(&self.default_policy)?;

        Ok(ReferenceData::new(
            parcel_counts,
            tier_schedules,
            self.comparison,
            self.default_policy,
        ))
    }
}

/// Parse reference tables from TOML text.
pub fn load_from_str(input: &str) -> Result<ReferenceData, ReferenceLoaderError> {
    let file: ReferenceFile = toml::from_str(input)?;
    file.into_reference()
}

/// Convenience wrapper: read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(path: &Path) -> Result<ReferenceData, ReferenceLoaderError> {
    let contents = std::fs::read_to_string(path)?;
    let reference = load_from_str(&contents)?;
    info!(path = %path.display(), "read reference tables");
    Ok(reference)
}

/// The FY 2026 tables compiled into the crate.
pub fn embedded() -> Result<ReferenceData, ReferenceLoaderError> {
    load_from_str(FY2026)
}
