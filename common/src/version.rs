//! Three-component binary version numbers.
//!
//! A [`Version`] identifies one build of the Drover tools. The major
//! component doubles as the compatibility epoch: resolution filters on it
//! exactly, while minor and patch only participate in ordering. Ordering is
//! total and lexicographic over (major, minor, patch); no pre-release or
//! build-metadata component is modelled.

use crate::error::{ModelError, Result};
use std::fmt;
use std::str::FromStr;

/// A `<major>.<minor>.<patch>` binary version.
///
/// # Examples
///
/// ```
/// use drover_common::Version;
///
/// let v: Version = "1.18.2".parse().expect("valid version");
/// assert_eq!(v.major, 1);
/// assert_eq!(v.to_string(), "1.18.2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Compatibility epoch. The primary filter during resolution.
    pub major: u32,
    /// Feature level within an epoch.
    pub minor: u32,
    /// Bug-fix level within a feature level.
    pub patch: u32,
}

impl Version {
    /// Create a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for Version {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, '.');
        let major = parse_component(s, parts.next(), "major")?;
        let minor = parse_component(s, parts.next(), "minor")?;
        let patch = parse_component(s, parts.next(), "patch")?;
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

/// Parse one dotted component, rejecting anything but plain decimal digits.
fn parse_component(input: &str, part: Option<&str>, which: &str) -> Result<u32> {
    let text = part.ok_or_else(|| ModelError::InvalidVersion {
        value: input.to_owned(),
        reason: format!("missing {which} component"),
    })?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ModelError::InvalidVersion {
            value: input.to_owned(),
            reason: format!("{which} component {text:?} is not a decimal number"),
        });
    }
    text.parse().map_err(|_| ModelError::InvalidVersion {
        value: input.to_owned(),
        reason: format!("{which} component {text:?} is out of range"),
    })
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::simple("1.18.2", Version::new(1, 18, 2))]
    #[case::zeroes("0.0.0", Version::new(0, 0, 0))]
    #[case::wide("10.200.3000", Version::new(10, 200, 3000))]
    fn parses_well_formed_versions(#[case] input: &str, #[case] expected: Version) {
        let parsed: Version = input.parse().expect("should parse");
        assert_eq!(parsed, expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::two_components("1.18")]
    #[case::four_components("1.18.2.4")]
    #[case::non_numeric("1.x.2")]
    #[case::signed("1.-2.3")]
    #[case::plus_prefixed("+1.2.3")]
    #[case::trailing_dot("1.2.")]
    #[case::dev_suffix("1.2.3-alpha")]
    fn rejects_malformed_versions(#[case] input: &str) {
        let result = input.parse::<Version>();
        assert!(
            matches!(result, Err(ModelError::InvalidVersion { .. })),
            "expected InvalidVersion for {input:?}, got {result:?}"
        );
    }

    #[rstest]
    #[case("1.2.0", "1.2.5")]
    #[case("1.2.5", "1.3.0")]
    #[case("1.99.99", "2.0.0")]
    #[case("0.9.9", "0.10.0")]
    fn ordering_is_lexicographic_numeric(#[case] lower: &str, #[case] higher: &str) {
        let lower: Version = lower.parse().expect("valid");
        let higher: Version = higher.parse().expect("valid");
        assert!(lower < higher);
    }

    #[test]
    fn display_round_trips() {
        let v = Version::new(2, 4, 17);
        let reparsed: Version = v.to_string().parse().expect("display output parses");
        assert_eq!(reparsed, v);
    }
}
