//! CSV loader for pending appeal amounts (`Appeals.csv`).
//!
//! ## CSV Format
//!
//! | Column         | Type    | Notes                                        |
//! |----------------|---------|----------------------------------------------|
//! | `TAX CLASS`    | string  | Class name as in the class table             |
//! | `APPEAL VALUE` | decimal | Dollars; thousands separators are accepted   |
//!
//! Headers and cells are whitespace-trimmed. Other columns are ignored.
//!
//! ```csv
//! TAX CLASS,APPEAL VALUE
//! COMMERCIAL,"12,500,000"
//! OWNER-OCCUPIED,"3,250,000"
//! ```

use std::path::Path;

use forecast_core::{AppealMap, TaxClass};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::utils::{ParseDecimalError, parse_amount};

pub const DEFAULT_FILE_NAME: &str = "Appeals.csv";

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "TAX CLASS")]
    tax_class: String,
    #[serde(rename = "APPEAL VALUE")]
    appeal_value: String,
}

/// Errors that can occur while loading the appeals file.
#[derive(Debug, Error)]
pub enum AppealsLoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad structure or a missing required column.
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// `row` is 1-based (header = row 0).
    #[error("row {row}: {source}")]
    InvalidAmount {
        row: usize,
        #[source]
        source: ParseDecimalError,
    },
}

/// Parse CSV text and return the appeal amount per class. A class listed
/// more than once keeps its last amount; blank amounts read as zero.
pub fn load_from_str(input: &str) -> Result<AppealMap, AppealsLoaderError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let mut appeals = AppealMap::default();
    for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let row_number = idx + 1;

        let amount = parse_amount(&row.appeal_value)
            .map_err(|source| AppealsLoaderError::InvalidAmount {
                row: row_number,
                source,
            })?
            .unwrap_or(Decimal::ZERO);

        match TaxClass::parse(&row.tax_class) {
            Some(class) => appeals.insert(class, amount),
            None => warn!(
                row = row_number,
                class = %row.tax_class,
                "skipping appeal for unknown tax class"
            ),
        }
    }

    Ok(appeals)
}

/// Convenience wrapper: read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(path: &Path) -> Result<AppealMap, AppealsLoaderError> {
    let contents = std::fs::read_to_string(path)?;
    let appeals = load_from_str(&contents)?;
    info!(path = %path.display(), classes = appeals.len(), "read appeals file");
    Ok(appeals)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const APPEALS_CSV: &str = "\
 TAX CLASS , APPEAL VALUE
COMMERCIAL,\"12,500,000\"
 OWNER-OCCUPIED ,  3250000.50
";

    #[test]
    fn test_headers_and_cells_are_trimmed() {
        let appeals = load_from_str(APPEALS_CSV).unwrap();

        assert_eq!(appeals.len(), 2);
        assert_eq!(appeals.amount(TaxClass::Commercial), dec!(12500000));
        assert_eq!(appeals.amount(TaxClass::OwnerOccupied), dec!(3250000.50));
    }

    #[test]
    fn test_unknown_class_is_skipped() {
        let csv = "TAX CLASS,APPEAL VALUE\nRESORT SPA,100\nAPARTMENT,200\n";

        let appeals = load_from_str(csv).unwrap();

        assert_eq!(appeals.len(), 1);
        assert_eq!(appeals.amount(TaxClass::Apartment), dec!(200));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let csv = "TAX CLASS,APPEAL VALUE\nAPARTMENT,100\nAPARTMENT,300\n";

        let appeals = load_from_str(csv).unwrap();

        assert_eq!(appeals.amount(TaxClass::Apartment), dec!(300));
    }

    #[test]
    fn test_blank_amount_reads_as_zero() {
        let csv = "TAX CLASS,APPEAL VALUE\nINDUSTRIAL,\n";

        let appeals = load_from_str(csv).unwrap();

        assert_eq!(appeals.len(), 1);
        assert_eq!(appeals.amount(TaxClass::Industrial), dec!(0));
    }

    #[test]
    fn test_invalid_amount_reports_row() {
        let csv = "TAX CLASS,APPEAL VALUE\nAPARTMENT,100\nCOMMERCIAL,lots\n";

        let err = load_from_str(csv).unwrap_err();

        assert!(matches!(err, AppealsLoaderError::InvalidAmount { row: 2, .. }));
    }

    #[test]
    fn test_missing_column_is_parse_error() {
        let csv = "TAX CLASS\nAPARTMENT\n";

        assert!(matches!(
            load_from_str(csv),
            Err(AppealsLoaderError::Parse(_))
        ));
    }
}
