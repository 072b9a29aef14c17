//! Property tax revenue forecast calculations.
//!
//! Each stage of the pipeline lives in its own module; [`forecast`] chains
//! them together and [`tier_counts`] reuses the tier machinery for the
//! per-tier parcel count report.

pub mod adjust;
pub mod aggregate;
pub mod common;
pub mod forecast;
pub mod net_value;
pub mod tax_engine;
pub mod tier_counts;
pub mod totals;

pub use forecast::{ForecastError, ForecastParams, run_forecast};
pub use net_value::{AssessedParcel, AssessedRoll, assess};
pub use tax_engine::{Bracket, TaxEngine, TaxedParcel, TaxedRoll, TierSchedule};
pub use tier_counts::{TierCountRefusal, tier_counts};
