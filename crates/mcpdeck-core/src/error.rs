//! Error types for the synchronization core.

use std::io;

use mcpdeck_models::EntityId;
use thiserror::Error;

/// Result alias for durable persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Result alias for configuration parsing.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failures raised by the durable key-value store.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Reading or writing the backing file failed.
    #[error("snapshot storage operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Storage key being accessed.
        key: String,
        /// Source IO error.
        source: io::Error,
    },
    /// The stored payload could not be encoded or decoded.
    #[error("snapshot payload was not valid JSON")]
    Json {
        /// Operation identifier.
        operation: &'static str,
        /// Storage key being accessed.
        key: String,
        /// Source serde error.
        source: serde_json::Error,
    },
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Name of the field or environment variable.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

/// Malformed local input, rejected before any state change or network call.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A batch operation was requested with nothing selected.
    #[error("select at least one record")]
    EmptySelection,
    /// A required field was missing or blank.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// A JSON-valued field did not parse.
    #[error("{field} must be valid JSON")]
    InvalidJson {
        /// Name of the offending field.
        field: &'static str,
        /// Parser error.
        source: serde_json::Error,
    },
    /// The targeted record is not part of the current snapshot.
    #[error("record is no longer listed; reload and try again")]
    UnknownRecord {
        /// Identifier that could not be resolved.
        id: EntityId,
    },
    /// Tools of a disabled market cannot be browsed.
    #[error("market is disabled; enable it first")]
    MarketDisabled {
        /// Market that was requested.
        market_id: EntityId,
    },
}

impl ValidationError {
    /// Check that an optional JSON-valued field parses when present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidJson`] when the value is not JSON.
    pub fn check_json(field: &'static str, value: Option<&str>) -> Result<(), Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(()),
            Some(raw) => serde_json::from_str::<serde_json::Value>(raw)
                .map(|_| ())
                .map_err(|source| Self::InvalidJson { field, source }),
        }
    }

    /// Check that a required text field is present and not blank.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when the value is absent or blank.
    pub fn check_required(field: &'static str, value: Option<&str>) -> Result<(), Self> {
        match value.map(str::trim) {
            Some(text) if !text.is_empty() => Ok(()),
            _ => Err(Self::MissingField { field }),
        }
    }
}
