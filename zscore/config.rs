// ========================================================================================
//
//                                  Run configuration
//
// ========================================================================================

use crate::scheme::Scheme;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Settings for one scoring run, stored as TOML.
///
/// ```toml
/// scheme = "metaxcan"
/// threads = 8
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Unknown scheme names are rejected while the file is parsed.
    pub scheme: Scheme,
    /// Worker threads for the gene batch. All cores when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML config file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_scheme_and_threads() {
        let config = RunConfig::from_toml_str("scheme = \"beta_z_and_ref\"\nthreads = 4\n").unwrap();
        assert_eq!(config.scheme, Scheme::BetaZAndRef);
        assert_eq!(config.threads, Some(4));
    }

    #[test]
    fn unknown_scheme_fails_at_load_time() {
        let err = RunConfig::from_toml_str("scheme = \"zscore\"\n").unwrap_err();
        match err {
            ConfigError::TomlParseError(e) => {
                assert!(e.to_string().contains("Unknown zscore scheme 'zscore'"))
            }
            other => panic!("Expected TomlParseError, got {:?}", other),
        }
    }

    #[test]
    fn save_then_load_keeps_the_scheme() {
        let file = NamedTempFile::new().unwrap();
        let config = RunConfig {
            scheme: Scheme::MetaXcanFromReference,
            threads: None,
        };
        config.save(file.path()).unwrap();

        let text = fs::read_to_string(file.path()).unwrap();
        assert!(text.contains("metaxcan_from_reference"));
        assert_eq!(RunConfig::load(file.path()).unwrap(), config);
    }
}
