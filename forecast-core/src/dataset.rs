use thiserror::Error;
use tracing::info;

use crate::models::ParcelRecord;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Assessment data not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Malformed assessment data: {0}")]
    Malformed(String),
}

/// Anything that can produce the assessment roll: a fixed-width file, a test
/// fixture, a future database.
pub trait AssessmentSource: Send + Sync {
    /// Short description for log messages (a path, a table name).
    fn describe(&self) -> String;

    fn load(&self) -> Result<Vec<ParcelRecord>, SourceError>;
}

/// The assessment roll, loaded once and never modified afterwards.
///
/// Share it between requests behind an `Arc`; every forecast reads it through
/// [`ParcelDataset::records`] and derives its own working rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParcelDataset {
    records: Vec<ParcelRecord>,
}

impl ParcelDataset {
    pub fn new(records: Vec<ParcelRecord>) -> Self {
        Self { records }
    }

    pub fn load(source: &dyn AssessmentSource) -> Result<Self, SourceError> {
        let records = source.load()?;
        info!(
            source = %source.describe(),
            records = records.len(),
            "loaded assessment roll"
        );
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[ParcelRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
