//! Semantic error types for compatibility-model validation failures.
//!
//! Each variant names the rejected input so callers can surface a
//! descriptive message without reconstructing context.

use thiserror::Error;

/// Errors raised when constructing compatibility-model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A version string did not match `<major>.<minor>.<patch>`.
    #[error("invalid version {value:?}: {reason}")]
    InvalidVersion {
        /// The rejected input.
        value: String,
        /// Description of what made the input invalid.
        reason: String,
    },

    /// A series label failed validation.
    #[error("invalid series {value:?}: {reason}")]
    InvalidSeries {
        /// The rejected input.
        value: String,
        /// Description of what made the input invalid.
        reason: String,
    },

    /// An architecture label failed validation.
    #[error("invalid architecture {value:?}: {reason}")]
    InvalidArch {
        /// The rejected input.
        value: String,
        /// Description of what made the input invalid.
        reason: String,
    },
}

/// Result type alias using [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_version_names_the_input() {
        let err = ModelError::InvalidVersion {
            value: "1.2".to_owned(),
            reason: "missing patch component".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1.2"));
        assert!(msg.contains("missing patch component"));
    }

    #[test]
    fn invalid_series_names_the_input() {
        let err = ModelError::InvalidSeries {
            value: String::new(),
            reason: "must not be empty".to_owned(),
        };
        assert!(err.to_string().contains("must not be empty"));
    }
}
