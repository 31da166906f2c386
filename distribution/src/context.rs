//! The environment-context collaborator.
//!
//! Publishing needs to know the invoking node's compatibility triple to
//! compute the canonical path. Where that triple comes from (agent
//! configuration, a control-plane handshake) is out of scope here; the
//! engine consumes it through this read-only accessor so tests can
//! substitute deterministic doubles.

use drover_common::{Arch, Series, Version};

/// Read-only access to the invoking node's compatibility triple.
#[cfg_attr(test, mockall::automock)]
pub trait ToolsContext {
    /// The node's current binary version.
    fn version(&self) -> Version;

    /// The node's OS-release series.
    fn series(&self) -> Series;

    /// The node's CPU architecture.
    fn arch(&self) -> Arch;
}

/// A context carrying a fixed triple.
///
/// The platform's configuration layer constructs one of these at startup;
/// [`HostContext::for_host`] fills in the running process's architecture.
///
/// # Examples
///
/// ```
/// use drover_common::{Series, Version};
/// use drover_distribution::context::{HostContext, ToolsContext};
///
/// let series = Series::try_from("noble").expect("valid series");
/// let context = HostContext::for_host(Version::new(1, 18, 2), series);
/// assert_eq!(context.version(), Version::new(1, 18, 2));
/// ```
#[derive(Debug, Clone)]
pub struct HostContext {
    version: Version,
    series: Series,
    arch: Arch,
}

impl HostContext {
    /// Create a context from an explicit triple.
    #[must_use]
    pub const fn new(version: Version, series: Series, arch: Arch) -> Self {
        Self {
            version,
            series,
            arch,
        }
    }

    /// Create a context for the running process's architecture.
    #[must_use]
    pub fn for_host(version: Version, series: Series) -> Self {
        Self::new(version, series, Arch::host())
    }
}

impl ToolsContext for HostContext {
    fn version(&self) -> Version {
        self.version
    }

    fn series(&self) -> Series {
        self.series.clone()
    }

    fn arch(&self) -> Arch {
        self.arch.clone()
    }
}
