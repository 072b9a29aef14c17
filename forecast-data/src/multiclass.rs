//! `MULTIPLE_CLASS_FLAG` counts from the parcel file (`fullpardat25.txt`)
//! and the land-area-by-class file (`fulllndarclass25.txt`).
//!
//! The flag marks parcels with more than one land class on record. It is
//! reported for inspection only; billing uses the tax rate class on the
//! assessment roll. Only the flag column is read:
//!
//! | File                   | Flag byte |
//! |------------------------|-----------|
//! | `fullpardat25.txt`     | 18..19    |
//! | `fulllndarclass25.txt` | 17..18    |
//!
//! Blank lines are skipped. A blank flag, or a line too short to hold one,
//! is counted under [`FLAG_NOT_SET`].

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::ops::Range;
use std::path::Path;

use forecast_core::{FLAG_NOT_SET, FlagCounts};
use thiserror::Error;
use tracing::info;

use crate::utils::field;

#[derive(Debug, Error)]
pub enum FlagLoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The fixed-width files that carry a multi-class flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagFile {
    Pardat,
    Lndar,
}

impl FlagFile {
    pub const ALL: [FlagFile; 2] = [Self::Pardat, Self::Lndar];

    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Pardat => "fullpardat25.txt",
            Self::Lndar => "fulllndarclass25.txt",
        }
    }

    fn flag_column(self) -> Range<usize> {
        match self {
            Self::Pardat => 18..19,
            Self::Lndar => 17..18,
        }
    }

    /// Counts each flag value in `reader`.
    pub fn count_flags<R: Read>(
        self,
        reader: R,
    ) -> Result<FlagCounts, FlagLoaderError> {
        let mut counts = FlagCounts::new();

        for line in BufReader::new(reader).split(b'\n') {
            let mut line = line?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let flag = field(&line, self.flag_column());
            let key = if flag.is_empty() {
                FLAG_NOT_SET.to_string()
            } else {
                flag
            };
            *counts.entry(key).or_insert(0) += 1;
        }

        Ok(counts)
    }

    /// Opens `path` and delegates to [`FlagFile::count_flags`].
    pub fn load_from_file(
        self,
        path: &Path,
    ) -> Result<FlagCounts, FlagLoaderError> {
        let counts = self.count_flags(File::open(path)?)?;
        info!(
            path = %path.display(),
            records = counts.values().sum::<u64>(),
            "read multi-class flags"
        );
        Ok(counts)
    }
}
