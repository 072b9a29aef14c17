pub mod appeals;
pub mod assessment;
pub mod multiclass;
pub mod reference;
mod utils;

pub use appeals::AppealsLoaderError;
pub use assessment::{AssessmentLoader, AssessmentLoaderError, FixedWidthAssessmentFile};
pub use multiclass::{FlagFile, FlagLoaderError};
pub use reference::ReferenceLoaderError;
pub use utils::ParseDecimalError;
