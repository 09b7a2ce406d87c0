//! Errors for data loaded from outside the simulation.
//!
//! The simulation itself never fails: invariant violations are debug
//! assertions and degrade to logged no-ops in release builds. Only parsing
//! tuning files and high-score tables, or touching the files they live
//! in, can produce an error.

use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or written.
    Io(std::io::Error),

    /// The JSON document could not be parsed.
    Parse(serde_json::Error),

    /// A value parsed fine but is outside the range the simulation accepts.
    InvalidValue {
        /// Field name (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f64,
        /// Human-readable description of the accepted range.
        expected: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "I/O error: {}", err),
            ConfigError::Parse(err) => write!(f, "malformed JSON: {}", err),
            ConfigError::InvalidValue {
                name,
                value,
                expected,
            } => write!(f, "'{}' = {} is invalid (expected {})", name, value, expected),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::InvalidValue { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}
