//! Configuration loading
//!
//! Reads a [`CoglineConfig`] from TOML. Every section and key is optional
//! and falls back to its default:
//!
//! ```toml
//! [timing]
//! pause_unit_us = 1000
//! io_unit_us = 1
//! io_timeout_ms = 250
//!
//! [pool]
//! workers = 7
//!
//! [dac]
//! resolution_bits = 10
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use cogline_core::config::CoglineConfig;

/// Configuration loading failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("configuration rejected: {0}")]
    Invalid(cogline_core::Error),
}

/// Parse and validate a configuration document
pub fn from_toml_str(input: &str) -> Result<CoglineConfig, ConfigError> {
    let config: CoglineConfig = toml::from_str(input)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Read, parse and validate a configuration file
pub fn from_file(path: impl AsRef<Path>) -> Result<CoglineConfig, ConfigError> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml_str(&input)
}

/// Render a configuration as TOML
pub fn to_toml_string(config: &CoglineConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(from_toml_str("").unwrap(), CoglineConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = from_toml_str(
            r#"
            [timing]
            io_timeout_ms = 20

            [dac]
            resolution_bits = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.timing.io_timeout_ms, 20);
        assert_eq!(config.timing.pause_unit_us, 1_000);
        assert_eq!(config.dac.resolution_bits, 10);
        assert_eq!(config.pool.workers, 7);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = from_toml_str("[pool]\nworkers = 8\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(cogline_core::Error::InvalidArgument)
        ));
    }

    #[test]
    fn test_rejects_bad_syntax() {
        assert!(matches!(
            from_toml_str("[timing\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_round_trip_through_text() {
        let mut config = CoglineConfig::default();
        config.serial.rx_buffer = 128;
        let text = to_toml_string(&config).unwrap();
        assert_eq!(from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = from_file("/nonexistent/cogline.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cogline.toml"));
    }
}
