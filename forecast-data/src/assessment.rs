//! Loader for the assessor's fixed-width roll (`fullasmt25.txt`).
//!
//! ## Record layout
//!
//! Byte offsets, end exclusive. The file is latin-1; every field is trimmed.
//!
//! | Field                     | Bytes   | Type    |
//! |---------------------------|---------|---------|
//! | division                  | 0..1    | text    |
//! | zone                      | 1..2    | text    |
//! | section                   | 2..3    | text    |
//! | plat                      | 3..6    | text    |
//! | parcel                    | 6..9    | text    |
//! | cpr                       | 9..13   | text    |
//! | parcel year               | 13..18  | text    |
//! | land class                | 18..22  | text    |
//! | tax rate class            | 22..26  | integer |
//! | assessed land value       | 26..39  | decimal |
//! | land exemption            | 39..52  | decimal |
//! | assessed building value   | 52..65  | decimal |
//! | building exemption        | 65..78  | decimal |
//!
//! Blank lines are skipped. Numeric fields are required: a blank or
//! unparsable one stops the load rather than reading as zero.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::ops::Range;
use std::path::{Path, PathBuf};

use forecast_core::{AssessmentSource, ParcelKey, ParcelRecord, SourceError};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use crate::utils::field;

pub const DEFAULT_FILE_NAME: &str = "fullasmt25.txt";

const DIVISION: Range<usize> = 0..1;
const ZONE: Range<usize> = 1..2;
const SECTION: Range<usize> = 2..3;
const PLAT: Range<usize> = 3..6;
const PARCEL: Range<usize> = 6..9;
const CPR: Range<usize> = 9..13;
const PARCEL_YEAR: Range<usize> = 13..18;
const LAND_CLASS: Range<usize> = 18..22;
const TAX_RATE_CLASS: Range<usize> = 22..26;
const ASSESSED_LAND_VALUE: Range<usize> = 26..39;
const LAND_EXEMPTION: Range<usize> = 39..52;
const ASSESSED_BUILDING_VALUE: Range<usize> = 52..65;
const BUILDING_EXEMPTION: Range<usize> = 65..78;

/// Errors that can occur when reading the assessment roll.
#[derive(Debug, Error)]
pub enum AssessmentLoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// `line` is 1-based.
    #[error("line {line}: {column} is blank")]
    MissingField { line: usize, column: &'static str },

    #[error("line {line}: {column} has invalid number '{value}'")]
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },
}

fn required_number<T: std::str::FromStr>(
    line: &[u8],
    range: Range<usize>,
    column: &'static str,
    line_number: usize,
) -> Result<T, AssessmentLoaderError> {
    let value = field(line, range);
    if value.is_empty() {
        return Err(AssessmentLoaderError::MissingField {
            line: line_number,
            column,
        });
    }
    value
        .parse()
        .map_err(|_| AssessmentLoaderError::InvalidNumber {
            line: line_number,
            column,
            value,
        })
}

/// Parses one non-blank line. `line_number` is 1-based.
fn parse_line(
    line: &[u8],
    line_number: usize,
) -> Result<ParcelRecord, AssessmentLoaderError> {
    let amount = |range: Range<usize>, column: &'static str| {
        required_number::<Decimal>(line, range, column, line_number)
    };

    Ok(ParcelRecord {
        key: ParcelKey {
            division: field(line, DIVISION),
            zone: field(line, ZONE),
            section: field(line, SECTION),
            plat: field(line, PLAT),
            parcel: field(line, PARCEL),
            cpr: field(line, CPR),
        },
        parcel_year: field(line, PARCEL_YEAR),
        land_class: field(line, LAND_CLASS),
        tax_rate_class: required_number(line, TAX_RATE_CLASS, "TAX_RATE_CLASS", line_number)?,
        assessed_land_value: amount(ASSESSED_LAND_VALUE, "ASSESSED_LAND_VALUE")?,
        land_exemption: amount(LAND_EXEMPTION, "LAND_EXEMPTION")?,
        assessed_building_value: amount(ASSESSED_BUILDING_VALUE, "ASSESSED_BUILDING_VALUE")?,
        building_exemption: amount(BUILDING_EXEMPTION, "BUILDING_EXEMPTION")?,
    })
}

/// Parser for the fixed-width assessment roll.
pub struct AssessmentLoader;

impl AssessmentLoader {
    /// Parse every record from `reader`, in file order.
    ///
    /// The reader can be any type that implements `Read`, such as a file or
    /// a byte slice.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<ParcelRecord>, AssessmentLoaderError> {
        let mut records = Vec::new();

        for (idx, line) in BufReader::new(reader).split(b'\n').enumerate() {
            let mut line = line?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            records.push(parse_line(&line, idx + 1)?);
        }

        debug!(records = records.len(), "parsed assessment roll");
        Ok(records)
    }

    /// Convenience wrapper: open `path` and delegate to [`AssessmentLoader::parse`].
    pub fn load_from_file(path: &Path) -> Result<Vec<ParcelRecord>, AssessmentLoaderError> {
        let file = File::open(path)?;
        let records = Self::parse(file)?;
        info!(path = %path.display(), records = records.len(), "read assessment file");
        Ok(records)
    }
}

/// The assessment roll as a file on disk.
#[derive(Debug, Clone)]
pub struct FixedWidthAssessmentFile {
    path: PathBuf,
}

impl FixedWidthAssessmentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `fullasmt25.txt` inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(DEFAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AssessmentSource for FixedWidthAssessmentFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<ParcelRecord>, SourceError> {
        AssessmentLoader::load_from_file(&self.path).map_err(|err| match err {
            AssessmentLoaderError::Io(io) if io.kind() == io::ErrorKind::NotFound => {
                SourceError::NotFound(self.describe())
            }
            AssessmentLoaderError::Io(io) => SourceError::Io(format!("{}: {io}", self.describe())),
            other => SourceError::Malformed(format!("{}: {other}", self.describe())),
        })
    }
}
