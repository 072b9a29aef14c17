//! `property-forecast.toml`: where the data files live and how to log.
//!
//! Every key is optional:
//!
//! ```toml
//! data_dir = "data"
//! assessment_file = "fullasmt25.txt"
//! appeals_file = "Appeals.csv"
//! pardat_file = "fullpardat25.txt"           # multi-class flag counts only
//! lndar_file = "fulllndarclass25.txt"
//! reference_file = "reference/fy2026.toml"   # omit to use the built-in tables
//! log_dir = "/logs"                          # omit to skip the error log file
//! log_level = "info"
//! ```

use std::path::{Path, PathBuf};

use forecast_data::FlagFile;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "property-forecast.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_dir: PathBuf,
    pub assessment_file: String,
    pub appeals_file: String,
    pub pardat_file: String,
    pub lndar_file: String,
    pub reference_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            assessment_file: forecast_data::assessment::DEFAULT_FILE_NAME.to_string(),
            appeals_file: forecast_data::appeals::DEFAULT_FILE_NAME.to_string(),
            pardat_file: FlagFile::Pardat.default_file_name().to_string(),
            lndar_file: FlagFile::Lndar.default_file_name().to_string(),
            reference_file: None,
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(
        input: &str,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path` when given. Otherwise reads `property-forecast.toml` from
    /// the working directory if it exists, and falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&contents, &path)
    }

    pub fn assessment_path(&self) -> PathBuf {
        self.data_dir.join(&self.assessment_file)
    }

    pub fn appeals_path(&self) -> PathBuf {
        self.data_dir.join(&self.appeals_file)
    }

    pub fn flag_path(
        &self,
        file: FlagFile,
    ) -> PathBuf {
        match file {
            FlagFile::Pardat => self.data_dir.join(&self.pardat_file),
            FlagFile::Lndar => self.data_dir.join(&self.lndar_file),
        }
    }

    /// `<log_dir>/backend-error.log`, when a log directory is configured.
    pub fn error_log_path(&self) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(crate::logging::ERROR_LOG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(input: &str) -> Result<Config, ConfigError> {
        Config::from_toml_str(input, Path::new("test.toml"))
    }

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(parse("").unwrap(), Config::default());
    }

    #[test]
    fn defaults_point_at_data_dir() {
        let config = Config::default();

        assert_eq!(config.assessment_path(), PathBuf::from("data/fullasmt25.txt"));
        assert_eq!(config.appeals_path(), PathBuf::from("data/Appeals.csv"));
        assert_eq!(
            config.flag_path(FlagFile::Pardat),
            PathBuf::from("data/fullpardat25.txt")
        );
        assert_eq!(
            config.flag_path(FlagFile::Lndar),
            PathBuf::from("data/fulllndarclass25.txt")
        );
        assert_eq!(config.error_log_path(), None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn keys_override_defaults() {
        let config = parse(
            r#"
            data_dir = "/srv/forecast"
            appeals_file = "appeals-2026.csv"
            lndar_file = "lndar.txt"
            log_dir = "/logs"
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.assessment_path(), PathBuf::from("/srv/forecast/fullasmt25.txt"));
        assert_eq!(config.appeals_path(), PathBuf::from("/srv/forecast/appeals-2026.csv"));
        assert_eq!(
            config.flag_path(FlagFile::Lndar),
            PathBuf::from("/srv/forecast/lndar.txt")
        );
        assert_eq!(
            config.error_log_path(),
            Some(PathBuf::from("/logs/backend-error.log"))
        );
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.reference_file, None);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = parse("data_directory = \"x\"").unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("invalid config file 'test.toml'"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/property-forecast.toml"))).unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
