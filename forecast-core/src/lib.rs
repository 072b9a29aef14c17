pub mod calculations;
pub mod dataset;
pub mod models;
pub mod service;

pub use calculations::{ForecastError, ForecastParams, run_forecast};
pub use dataset::{AssessmentSource, ParcelDataset, SourceError};
pub use models::*;
pub use service::{ForecastService, ServiceError};
