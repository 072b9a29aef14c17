use std::ops::Range;

use rust_decimal::Decimal;
use thiserror::Error;

/// Error returned when a string cannot be parsed as a [`Decimal`].
#[derive(Debug, Error)]
#[error("invalid decimal '{input}': {source}")]
pub struct ParseDecimalError {
    input: String,
    #[source]
    source: rust_decimal::Error,
}

impl ParseDecimalError {
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Trims whitespace and removes commas (thousands separator).
fn normalize_decimal_input(s: &str) -> String {
    s.trim().replace(',', "")
}

/// Parses a dollar amount such as `"1,234,567.89"`.
///
/// Returns `None` for empty or whitespace-only input so callers decide
/// whether a blank is an error.
pub fn parse_amount(s: &str) -> Result<Option<Decimal>, ParseDecimalError> {
    let normalized = normalize_decimal_input(s);
    if normalized.is_empty() {
        return Ok(None);
    }
    normalized
        .parse()
        .map(Some)
        .map_err(|e| ParseDecimalError {
            input: s.to_string(),
            source: e,
        })
}

/// Decodes a latin-1 byte slice. Every byte maps to the code point of the
/// same value, so this never fails.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Text of `range` within a fixed-width `line`, latin-1 decoded and trimmed.
/// Short lines yield the part that exists, or an empty string.
pub fn field(
    line: &[u8],
    range: Range<usize>,
) -> String {
    let start = range.start.min(line.len());
    let end = range.end.min(line.len());
    decode_latin1(&line[start..end]).trim().to_string()
}
