//! The revenue forecast pipeline.
//!
//! | Step | Stage |
//! |------|-------|
//! | 1 | Net taxable value per parcel (disaster parcels excluded) |
//! | 2 | Per-parcel tax under the class's flat or tiered schedule |
//! | 3 | Aggregate by class; exemption count from handout parcel counts |
//! | 4 | Exemption averaging (optional) |
//! | 5 | Appeal deduction |
//! | 6 | Totals |
//!
//! Steps 4 and 5 both scale the class's revenue and tier rows; their order
//! matters because the appeal cap is applied to the already-averaged value.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::calculations::adjust::{apply_appeal, apply_exemption_average};
use crate::calculations::aggregate::aggregate;
use crate::calculations::net_value::assess;
use crate::calculations::tax_engine::TaxEngine;
use crate::calculations::totals::roll_up;
use crate::models::{
    AppealMap, ClassResult, ForecastRequest, ForecastResponse, ParcelRecord, Policy,
    PolicyError, ReferenceData, TaxClass,
};

/// Errors raised while running the forecast arithmetic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForecastError {
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("{class}: {source}")]
    InClass {
        class: TaxClass,
        #[source]
        source: Box<ForecastError>,
    },
}

impl ForecastError {
    /// Attaches the class being processed, once.
    pub fn in_class(
        self,
        class: TaxClass,
    ) -> Self {
        match self {
            Self::InClass { .. } => self,
            other => Self::InClass {
                class,
                source: Box::new(other),
            },
        }
    }
}

/// A forecast request after boundary validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForecastParams {
    pub policy: Policy,
    pub appeals: AppealMap,
    pub apply_exemption_average: bool,
}

impl ForecastParams {
    pub fn from_request(request: &ForecastRequest) -> Result<Self, PolicyError> {
        Ok(Self {
            policy: Policy::from_payload(&request.policy)?,
            appeals: AppealMap::from_payload(&request.appeals)?,
            apply_exemption_average: request.apply_exemption_average,
        })
    }
}

/// Applies steps 4 and 5 to every class. Works on its own map so a failure
/// part-way leaves nothing half-adjusted behind.
fn adjust_classes(
    mut results: BTreeMap<TaxClass, ClassResult>,
    params: &ForecastParams,
) -> Result<BTreeMap<TaxClass, ClassResult>, ForecastError> {
    for (class, result) in results.iter_mut() {
        if params.apply_exemption_average {
            apply_exemption_average(result).map_err(|e| e.in_class(*class))?;
        }
        apply_appeal(result, params.appeals.amount(*class)).map_err(|e| e.in_class(*class))?;
    }
    Ok(results)
}

/// Runs the full pipeline over a borrowed roll. The roll is never modified.
pub fn run_forecast(
    records: &[ParcelRecord],
    params: &ForecastParams,
    reference: &ReferenceData,
) -> Result<ForecastResponse, ForecastError> {
    let roll = assess(records);
    let taxed = TaxEngine::new(&params.policy).apply(&roll.parcels)?;
    let results = aggregate(taxed, &params.policy, reference)?;
    let results_by_class = adjust_classes(results, params)?;
    let totals = roll_up(&results_by_class)?;

    debug!(
        classes = results_by_class.len(),
        parcels = totals.parcel_count,
        revenue = %totals.certified_revenue,
        "forecast complete"
    );

    Ok(ForecastResponse {
        results_by_class,
        totals,
        comparison_data: reference.comparison().clone(),
    })
}
