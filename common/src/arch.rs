//! CPU architecture labels.
//!
//! Drover labels architectures the way its storage names do (`amd64`,
//! `arm64`, ...), which differs from the compiler's target vocabulary.
//! [`Arch::host`] maps the running process onto a Drover label. As with
//! series, matching is exact string equality and the label may not contain
//! `-` or `/`.

use crate::error::{ModelError, Result};
use crate::series::validate_label;
use std::fmt;

/// A validated CPU architecture label.
///
/// # Examples
///
/// ```
/// use drover_common::Arch;
///
/// let arch: Arch = "amd64".try_into().expect("valid architecture");
/// assert_eq!(arch.as_str(), "amd64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arch(String);

impl Arch {
    /// Return the architecture of the running process as a Drover label.
    #[must_use]
    pub fn host() -> Self {
        let label = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "i386",
            "aarch64" => "arm64",
            "arm" => "armhf",
            "powerpc64" => "ppc64el",
            other => other,
        };
        Self(label.to_owned())
    }

    /// Return the architecture as a string slice.
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

impl TryFrom<&str> for Arch {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self> {
        match validate_label(value) {
            None => Ok(Self(value.to_owned())),
            Some(reason) => Err(ModelError::InvalidArch {
                value: value.to_owned(),
                reason: reason.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for Arch {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for Arch {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
