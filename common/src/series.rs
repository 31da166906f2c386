//! OS-release series labels.
//!
//! A series names the operating-system release a tools build targets, for
//! example `precise` or `noble`. Matching is exact string equality with no
//! normalisation or aliasing. Because the canonical tools name joins its
//! fields with `-`, a series may not contain that character.

use crate::error::{ModelError, Result};
use std::fmt;

/// A validated OS-release series label.
///
/// # Examples
///
/// ```
/// use drover_common::Series;
///
/// let series: Series = "precise".try_into().expect("valid series");
/// assert_eq!(series.as_str(), "precise");
/// assert!(Series::try_from("pre-cise").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Series(String);

impl Series {
    /// Return the series as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<&str> for Series {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self> {
        match validate_label(value) {
            None => Ok(Self(value.to_owned())),
            Some(reason) => Err(ModelError::InvalidSeries {
                value: value.to_owned(),
                reason: reason.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for Series {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for Series {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check the character rules shared by series and architecture labels.
///
/// Returns `None` when the label is acceptable, or the rejection reason.
/// `-` would corrupt the canonical tools name; `/` would corrupt the
/// storage path.
pub(crate) fn validate_label(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        Some("must not be empty")
    } else if value.contains('-') {
        Some("must not contain '-'")
    } else if value.contains('/') {
        Some("must not contain '/'")
    } else {
        None
    }
}
