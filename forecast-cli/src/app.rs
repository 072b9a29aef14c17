//! Wires configuration, loaders and the forecast service together, and runs
//! the individual commands.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use forecast_core::{
    ForecastRequest, ForecastResponse, ForecastService, MultiClassFlagCounts, ParcelDataset,
    ReferenceData, ServiceError,
};
use forecast_data::{FixedWidthAssessmentFile, FlagFile, appeals, reference};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, info};

use crate::config::Config;

/// Loads the reference tables, then the roll, appeals and multi-class flags.
///
/// Reference tables are required. Any other file that fails to load is
/// logged and left out; requests that need it then report the data as
/// unavailable, and the multi-class report omits its counts.
pub fn build_service(config: &Config) -> Result<ForecastService> {
    let reference: ReferenceData = match &config.reference_file {
        Some(path) => reference::load_from_file(path)
            .with_context(|| format!("failed to load reference tables from '{}'", path.display()))?,
        None => reference::embedded().context("built-in reference tables are invalid")?,
    };
    let mut service = ForecastService::new(Arc::new(reference));

    let source = FixedWidthAssessmentFile::new(config.assessment_path());
    match ParcelDataset::load(&source) {
        Ok(dataset) => service = service.with_dataset(Arc::new(dataset)),
        Err(e) => error!(error = %e, "failed to load assessment data"),
    }

    let appeals_path = config.appeals_path();
    match appeals::load_from_file(&appeals_path) {
        Ok(appeals) => service = service.with_appeals(appeals),
        Err(e) => error!(path = %appeals_path.display(), error = %e, "failed to load appeals data"),
    }

    let mut flag_counts = MultiClassFlagCounts::default();
    for file in FlagFile::ALL {
        let path = config.flag_path(file);
        match file.load_from_file(&path) {
            Ok(counts) => match file {
                FlagFile::Pardat => flag_counts.pardat = Some(counts),
                FlagFile::Lndar => flag_counts.lndar = Some(counts),
            },
            Err(e) => error!(path = %path.display(), error = %e, "failed to load multi-class flags"),
        }
    }
    service = service.with_flag_counts(flag_counts);

    info!("data loading complete");
    Ok(service)
}

/// Reads and deserializes a JSON request file.
pub fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read request '{}'", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid request '{}'", path.display()))
}

pub fn write_json<T: Serialize>(
    mut out: impl Write,
    value: &T,
    pretty: bool,
) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Error body reported in place of a result, shaped like an HTTP error
/// response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub detail: String,
}

impl From<&ServiceError> for ErrorBody {
    fn from(error: &ServiceError) -> Self {
        Self {
            status: error.status_code(),
            detail: error.to_string(),
        }
    }
}

/// One entry of a batch run: the forecast, or why it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Forecast(Box<ForecastResponse>),
    Failed(ErrorBody),
}

impl From<Result<ForecastResponse, ServiceError>> for BatchOutcome {
    fn from(result: Result<ForecastResponse, ServiceError>) -> Self {
        match result {
            Ok(response) => Self::Forecast(Box::new(response)),
            Err(e) => Self::Failed(ErrorBody::from(&e)),
        }
    }
}

/// Runs every request on the blocking pool against the same shared service
/// and returns the outcomes in request order. A failed request does not stop
/// the others.
pub async fn run_batch(
    service: Arc<ForecastService>,
    requests: Vec<ForecastRequest>,
) -> Result<Vec<BatchOutcome>> {
    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let service = Arc::clone(&service);
            tokio::task::spawn_blocking(move || service.forecast(&request))
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (idx, handle) in handles.into_iter().enumerate() {
        let result = handle
            .await
            .with_context(|| format!("forecast task {} did not complete", idx + 1))?;
        outcomes.push(BatchOutcome::from(result));
    }
    Ok(outcomes)
}
