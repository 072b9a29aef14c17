//! Request handling over the shared, read-only assessment roll.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::calculations::aggregate::exemption_estimates;
use crate::calculations::net_value::assess;
use crate::calculations::{ForecastParams, run_forecast, tier_counts};
use crate::dataset::ParcelDataset;
use crate::models::{
    AppealMap, AppealsAndExemptions, ForecastRequest, ForecastResponse, MultiClassBehavior,
    MultiClassFlagCounts, Policy, PolicyError, PolicyPayload, ReferenceData, TierCountRequest,
    TierCountResponse,
};

const DATA_NOT_LOADED: &str = "Assessment data not loaded.";
const APPEALS_NOT_LOADED: &str = "Appeals data not loaded.";
const CALCULATION_FAILED: &str = "An error occurred during revenue calculation.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    DataUnavailable(&'static str),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    /// Details are logged, never returned to the caller.
    #[error("{0}")]
    Internal(&'static str),
}

impl ServiceError {
    /// HTTP-style status for outer surfaces that report one.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::DataUnavailable(_) => 503,
            Self::InvalidPolicy(_) => 422,
            Self::Internal(_) => 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForecastService {
    dataset: Option<Arc<ParcelDataset>>,
    appeals: Option<AppealMap>,
    flag_counts: MultiClassFlagCounts,
    reference: Arc<ReferenceData>,
}

impl ForecastService {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self {
            dataset: None,
            appeals: None,
            flag_counts: MultiClassFlagCounts::default(),
            reference,
        }
    }

    pub fn with_dataset(
        mut self,
        dataset: Arc<ParcelDataset>,
    ) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn with_appeals(
        mut self,
        appeals: AppealMap,
    ) -> Self {
        self.appeals = Some(appeals);
        self
    }

    /// Multi-class flag counts for the report. They never affect a forecast.
    pub fn with_flag_counts(
        mut self,
        flag_counts: MultiClassFlagCounts,
    ) -> Self {
        self.flag_counts = flag_counts;
        self
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// The loaded roll, or `DataUnavailable` when none (or an empty one) was loaded.
    pub fn dataset(&self) -> Result<&ParcelDataset, ServiceError> {
        match self.dataset.as_deref() {
            Some(dataset) if !dataset.is_empty() => Ok(dataset),
            _ => Err(ServiceError::DataUnavailable(DATA_NOT_LOADED)),
        }
    }

    pub fn forecast(
        &self,
        request: &ForecastRequest,
    ) -> Result<ForecastResponse, ServiceError> {
        let dataset = self.dataset()?;
        let params = ForecastParams::from_request(request)?;

        run_forecast(dataset.records(), &params, &self.reference).map_err(|e| {
            error!(
                error = %e,
                classes = params.policy.len(),
                apply_exemption_average = params.apply_exemption_average,
                "revenue calculation failed"
            );
            ServiceError::Internal(CALCULATION_FAILED)
        })
    }

    pub fn tier_counts(
        &self,
        request: &TierCountRequest,
    ) -> Result<TierCountResponse, ServiceError> {
        let dataset = self.dataset()?;
        let policy = Policy::from_payload(&request.policy)?;
        Ok(tier_counts(dataset.records(), &policy, &self.reference))
    }

    pub fn default_policy(&self) -> PolicyPayload {
        self.reference.default_policy().clone()
    }

    /// Loaded appeal amounts, and observed vs. expected parcel counts for
    /// every class in the table. Needs both the roll and the appeals file.
    pub fn appeals_and_exemptions(&self) -> Result<AppealsAndExemptions, ServiceError> {
        let appeals = self
            .appeals
            .as_ref()
            .filter(|appeals| !appeals.is_empty())
            .ok_or(ServiceError::DataUnavailable(APPEALS_NOT_LOADED))?;
        let dataset = self.dataset()?;
        let roll = assess(dataset.records());

        info!(
            parcels = roll.parcels.len(),
            "computed appeals and exemption summary"
        );

        Ok(AppealsAndExemptions {
            appeals: appeals.iter().map(|(class, amount)| (*class, *amount)).collect(),
            exemptions: exemption_estimates(&roll.parcels, &self.reference),
        })
    }

    pub fn multiclass_behavior(&self) -> MultiClassBehavior {
        MultiClassBehavior::with_counts(self.flag_counts.clone())
    }
}
