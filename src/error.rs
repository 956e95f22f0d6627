//! Error types for the adaptive map.
//!
//! Absent keys are not errors: `search` returns `None` and `delete` returns
//! `false`. The only failures are naming a structure that does not exist and
//! building a map from an unusable configuration.

use thiserror::Error;

/// Result type alias for adaptive map operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the adaptive map.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A structure name did not match any of the three backing structures.
    #[error("unknown structure: {name}")]
    InvalidTarget { name: String },

    /// A configuration value is out of range.
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
}

impl Error {
    pub(crate) fn invalid_target(name: impl Into<String>) -> Self {
        Error::InvalidTarget { name: name.into() }
    }

    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
