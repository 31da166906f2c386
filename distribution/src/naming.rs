//! The canonical naming codec for published tools archives.
//!
//! Every tools bundle lives at
//! `tools/drover-<major>.<minor>.<patch>-<series>-<arch>.tgz`, for example
//! `tools/drover-1.18.2-precise-amd64.tgz`. Encoding is exact and total for
//! any well-formed triple; decoding never fails the enclosing operation,
//! since a non-matching name yields `None` and the listing skips it and
//! continues. The two directions are mutually inverse because series and
//! architecture labels cannot contain `-`.

use drover_common::{Arch, Series, Version};
use std::fmt;

/// The fixed prefix under which all tools archives are stored.
pub const TOOLS_PREFIX: &str = "tools/drover-";

/// The fixed file extension for tools archives.
const TOOLS_SUFFIX: &str = ".tgz";

/// A decoded canonical tools name.
///
/// `Display` produces the canonical storage path, [`ToolsName::parse`]
/// inverts it.
///
/// # Examples
///
/// ```
/// use drover_common::{Arch, Series, Version};
/// use drover_distribution::naming::ToolsName;
///
/// let name = ToolsName {
///     version: Version::new(1, 18, 2),
///     series: Series::try_from("precise").expect("valid series"),
///     arch: Arch::try_from("amd64").expect("valid architecture"),
/// };
/// assert_eq!(name.to_string(), "tools/drover-1.18.2-precise-amd64.tgz");
/// assert_eq!(ToolsName::parse(&name.to_string()), Some(name));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsName {
    /// The bundle's binary version.
    pub version: Version,
    /// The OS-release series the bundle targets.
    pub series: Series,
    /// The CPU architecture the bundle targets.
    pub arch: Arch,
}

impl ToolsName {
    /// Decode a storage name into its triple.
    ///
    /// Returns `None` for anything that is not a canonical tools name:
    /// malformed and foreign entries are common in shared storage and must
    /// not abort a listing.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_prefix(TOOLS_PREFIX)?.strip_suffix(TOOLS_SUFFIX)?;
        let mut parts = stem.split('-');
        let version: Version = parts.next()?.parse().ok()?;
        let series = Series::try_from(parts.next()?).ok()?;
        let arch = Arch::try_from(parts.next()?).ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            version,
            series,
            arch,
        })
    }
}

impl fmt::Display for ToolsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{TOOLS_PREFIX}{}-{}-{}{TOOLS_SUFFIX}",
            self.version, self.series, self.arch
        )
    }
}

/// Encode a triple as its canonical storage path.
///
/// Used both to compute the publish path and, defensively, to validate a
/// version before any network call.
#[must_use]
pub fn tools_path(version: &Version, series: &Series, arch: &Arch) -> String {
    format!("{TOOLS_PREFIX}{version}-{series}-{arch}{TOOLS_SUFFIX}")
}

/// The listing prefix for one compatibility epoch.
///
/// The trailing `.` keeps `tools/drover-1.` from matching `tools/drover-10.`.
#[must_use]
pub fn major_prefix(major: u32) -> String {
    format!("{TOOLS_PREFIX}{major}.")
}
