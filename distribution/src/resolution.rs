//! Version resolution across prioritised storage tiers.
//!
//! Resolution is a pure function of the query and the queried tier's
//! current contents: no caching, no retries. Listings from shared storage
//! routinely contain foreign or historical entries, so decoding skips
//! anything unrecognisable and reports it through the log facade rather
//! than failing the caller. The tiered protocol consults the private tier
//! first and degrades to the public tier only on the distinguished
//! not-found kind; any other private-tier error means the primary tier is
//! unhealthy and must not be silently bypassed.

use crate::naming::{self, ToolsName};
use crate::storage::{Storage, StorageError};
use drover_common::{Arch, Series, Version};
use std::fmt;
use thiserror::Error;

/// The query triple: what a node is looking for.
///
/// Only the major component of `version` participates in matching; the
/// rest is advisory context carried for future extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsSpec {
    /// The requesting node's binary version.
    pub version: Version,
    /// The OS-release series required.
    pub series: Series,
    /// The CPU architecture required.
    pub arch: Arch,
}

impl fmt::Display for ToolsSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.version, self.series, self.arch)
    }
}

/// One published tools bundle and where to fetch it.
///
/// Immutable once constructed. The URL is rooted in the tier that produced
/// the descriptor and is never conflated with another tier's namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsDescriptor {
    /// The bundle's binary version.
    pub version: Version,
    /// The OS-release series the bundle targets.
    pub series: Series,
    /// The CPU architecture the bundle targets.
    pub arch: Arch,
    /// Where the bundle can be fetched from.
    pub url: String,
}

/// Errors surfaced by resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The queried scope holds no tools matching the spec.
    #[error("no tools found matching {spec}")]
    NotFound {
        /// The query that produced no match.
        spec: ToolsSpec,
    },

    /// The storage tier failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ResolveError {
    /// Whether this error is the distinguished not-found kind.
    ///
    /// A tier reporting [`StorageError::NotFound`] counts: both mean "the
    /// queried scope has nothing for you", which licenses fallback.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            ResolveError::NotFound { .. } => true,
            ResolveError::Storage(err) => err.is_not_found(),
        }
    }
}

/// Decode the names of one epoch bucket, skipping anything unrecognisable.
///
/// Malformed names and entries whose parsed major version disagrees with
/// the bucket are logged and dropped; they must never abort the listing.
fn decode_bucket<'a>(
    names: &'a [String],
    major: u32,
) -> impl Iterator<Item = (&'a str, ToolsName)> + 'a {
    names.iter().filter_map(move |name| {
        let Some(parsed) = ToolsName::parse(name) else {
            log::warn!("ignoring unexpected entry {name:?} in tools listing");
            return None;
        };
        if parsed.version.major != major {
            log::warn!(
                "ignoring {name:?}: version {} found in the {major}.x bucket",
                parsed.version
            );
            return None;
        }
        Some((name.as_str(), parsed))
    })
}

/// List all tools in `store` with the given major version.
///
/// Entries that fail to decode, fall outside the requested epoch, or whose
/// URL cannot be resolved are skipped with a logged warning. An empty
/// result is `Ok`, not an error.
///
/// # Errors
///
/// Returns [`ResolveError::Storage`] only if the listing itself fails.
pub fn list_tools(store: &dyn Storage, major: u32) -> Result<Vec<ToolsDescriptor>, ResolveError> {
    let names = store.list(&naming::major_prefix(major))?;
    let mut tools = Vec::new();
    for (name, parsed) in decode_bucket(&names, major) {
        match store.url(name) {
            Ok(url) => tools.push(ToolsDescriptor {
                version: parsed.version,
                series: parsed.series,
                arch: parsed.arch,
                url,
            }),
            Err(err) => log::warn!("cannot resolve URL for {name:?}: {err}"),
        }
    }
    Ok(tools)
}

/// Pick the most recent descriptor compatible with `spec`.
///
/// Compatible means: equal major version, equal series, equal architecture.
/// Among the survivors the strictly greatest full version wins; ties cannot
/// occur because publishing overwrites same-triple artifacts.
///
/// # Errors
///
/// Returns [`ResolveError::NotFound`] when no descriptor survives the
/// filter: never a zero-value descriptor.
pub fn best_tools<'a>(
    tools: &'a [ToolsDescriptor],
    spec: &ToolsSpec,
) -> Result<&'a ToolsDescriptor, ResolveError> {
    tools
        .iter()
        .filter(|t| {
            t.version.major == spec.version.major && t.series == spec.series && t.arch == spec.arch
        })
        .max_by_key(|t| t.version)
        .ok_or_else(|| ResolveError::NotFound { spec: spec.clone() })
}

/// Find the storage name of the best tools match in a single tier.
///
/// Operates on raw names so that URL resolution, which may be an expensive
/// or failing remote call, is deferred until after a winner is chosen.
///
/// # Errors
///
/// Returns [`ResolveError::NotFound`] when the tier has no match, or
/// [`ResolveError::Storage`] when the listing fails.
pub fn find_tools_path(store: &dyn Storage, spec: &ToolsSpec) -> Result<String, ResolveError> {
    let prefix = naming::major_prefix(spec.version.major);
    let names = store.list(&prefix)?;
    log::debug!(
        "searching for {spec} among {} entries under {prefix:?}",
        names.len()
    );
    decode_bucket(&names, spec.version.major)
        .filter(|(_, parsed)| parsed.series == spec.series && parsed.arch == spec.arch)
        .max_by_key(|(_, parsed)| parsed.version)
        .map(|(name, _)| name.to_owned())
        .ok_or_else(|| ResolveError::NotFound { spec: spec.clone() })
}

/// The tiered-fallback protocol: private tier first, public tier second.
///
/// The public tier is consulted if and only if the private tier failed
/// with the not-found kind. Any other private-tier error is returned
/// immediately without touching the public tier: an unhealthy primary must
/// not be silently bypassed. Returns the tier that produced the match so
/// the caller resolves the winning name against the right namespace.
///
/// # Errors
///
/// Returns the private tier's error unless it was not-found, in which case
/// the public tier's outcome (match or error) is returned.
pub fn find_tools<'a>(
    private: &'a dyn Storage,
    public: &'a dyn Storage,
    spec: &ToolsSpec,
) -> Result<(&'a dyn Storage, String), ResolveError> {
    match find_tools_path(private, spec) {
        Ok(path) => Ok((private, path)),
        Err(err) if err.is_not_found() => {
            let path = find_tools_path(public, spec)?;
            Ok((public, path))
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EmptyStorage;
    use crate::test_support::MemoryStorage;
    use rstest::{fixture, rstest};
    use std::io::Read;

    fn spec(version: &str, series: &str, arch: &str) -> ToolsSpec {
        ToolsSpec {
            version: version.parse().expect("valid version"),
            series: Series::try_from(series).expect("valid series"),
            arch: Arch::try_from(arch).expect("valid architecture"),
        }
    }

    fn descriptor(version: &str, series: &str, arch: &str) -> ToolsDescriptor {
        ToolsDescriptor {
            version: version.parse().expect("valid version"),
            series: Series::try_from(series).expect("valid series"),
            arch: Arch::try_from(arch).expect("valid architecture"),
            url: format!("memory:///tools/drover-{version}-{series}-{arch}.tgz"),
        }
    }

    #[fixture]
    fn populated_store() -> MemoryStorage {
        let store = MemoryStorage::new();
        store.insert("tools/drover-1.2.0-precise-amd64.tgz", b"a");
        store.insert("tools/drover-1.2.5-precise-amd64.tgz", b"b");
        store.insert("tools/drover-1.3.0-precise-amd64.tgz", b"c");
        store.insert("tools/drover-1.3.0-noble-amd64.tgz", b"d");
        store.insert("tools/drover-1.3.0-precise-arm64.tgz", b"e");
        store
    }

    #[rstest]
    fn list_tools_returns_decoded_descriptors(populated_store: MemoryStorage) {
        let tools = list_tools(&populated_store, 1).expect("listing succeeds");
        assert_eq!(tools.len(), 5);
        assert!(tools.contains(&descriptor("1.2.5", "precise", "amd64")));
    }

    #[rstest]
    fn list_tools_skips_malformed_entries(populated_store: MemoryStorage) {
        populated_store.insert("tools/drover-1.nonsense", b"junk");
        populated_store.insert("tools/drover-1.2.3-pre-cise-amd64.tgz", b"junk");
        let tools = list_tools(&populated_store, 1).expect("listing succeeds");
        assert_eq!(tools.len(), 5);
    }

    #[rstest]
    fn list_tools_skips_entries_without_urls(populated_store: MemoryStorage) {
        populated_store.fail_url_for("tools/drover-1.2.0-precise-amd64.tgz");
        let tools = list_tools(&populated_store, 1).expect("listing succeeds");
        assert_eq!(tools.len(), 4);
        assert!(!tools.contains(&descriptor("1.2.0", "precise", "amd64")));
    }

    #[test]
    fn list_tools_skips_entries_outside_the_bucket() {
        // A backend that leaks entries from other epochs into the listing.
        struct SpilledBucket;
        impl Storage for SpilledBucket {
            fn list(&self, _prefix: &str) -> Result<Vec<String>, StorageError> {
                Ok(vec![
                    "tools/drover-1.9.0-precise-amd64.tgz".to_owned(),
                    "tools/drover-2.0.0-precise-amd64.tgz".to_owned(),
                ])
            }
            fn get(&self, name: &str) -> Result<Box<dyn Read>, StorageError> {
                Err(StorageError::NotFound {
                    name: name.to_owned(),
                })
            }
            fn put(
                &self,
                _name: &str,
                _data: &mut dyn Read,
                _length: u64,
            ) -> Result<(), StorageError> {
                unreachable!("listing never writes")
            }
            fn url(&self, name: &str) -> Result<String, StorageError> {
                Ok(format!("memory:///{name}"))
            }
        }

        let tools = list_tools(&SpilledBucket, 1).expect("listing succeeds");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].version, Version::new(1, 9, 0));
    }

    #[test]
    fn list_tools_empty_bucket_is_ok() {
        let tools = list_tools(&MemoryStorage::new(), 1).expect("empty is not an error");
        assert!(tools.is_empty());
    }

    #[test]
    fn best_tools_picks_the_greatest_compatible_version() {
        let tools = vec![
            descriptor("1.2.0", "precise", "amd64"),
            descriptor("1.2.5", "precise", "amd64"),
            descriptor("1.3.0", "precise", "amd64"),
        ];
        let best = best_tools(&tools, &spec("1.0.0", "precise", "amd64")).expect("match exists");
        assert_eq!(best.version, Version::new(1, 3, 0));
    }

    #[rstest]
    #[case::wrong_series("1.3.0", "noble", "amd64")]
    #[case::wrong_arch("1.3.0", "precise", "arm64")]
    #[case::wrong_major("2.0.0", "precise", "amd64")]
    fn best_tools_never_selects_incompatible_descriptors(
        #[case] version: &str,
        #[case] series: &str,
        #[case] arch: &str,
    ) {
        let tools = vec![descriptor(version, series, arch)];
        let result = best_tools(&tools, &spec("1.0.0", "precise", "amd64"));
        assert!(matches!(result, Err(ResolveError::NotFound { .. })));
    }

    #[test]
    fn best_tools_over_nothing_is_not_found() {
        let result = best_tools(&[], &spec("1.0.0", "precise", "amd64"));
        let err = result.expect_err("no descriptors to choose from");
        assert!(err.is_not_found());
    }

    #[rstest]
    fn find_tools_path_picks_best_without_resolving_urls(populated_store: MemoryStorage) {
        let path = find_tools_path(&populated_store, &spec("1.0.0", "precise", "amd64"))
            .expect("match exists");
        assert_eq!(path, "tools/drover-1.3.0-precise-amd64.tgz");
        // URL resolution is deferred until after selection.
        assert_eq!(populated_store.url_calls(), 0);
    }

    #[rstest]
    fn find_tools_path_misses_with_not_found(populated_store: MemoryStorage) {
        let result = find_tools_path(&populated_store, &spec("1.0.0", "trusty", "amd64"));
        assert!(result.expect_err("no trusty build published").is_not_found());
    }

    #[rstest]
    fn find_tools_prefers_the_private_tier(populated_store: MemoryStorage) {
        let public = MemoryStorage::new();
        public.insert("tools/drover-1.9.9-precise-amd64.tgz", b"mirror");
        let (tier, path) = find_tools(&populated_store, &public, &spec("1.0.0", "precise", "amd64"))
            .expect("private tier has a match");
        // The private match wins even though the mirror has a newer build.
        assert_eq!(path, "tools/drover-1.3.0-precise-amd64.tgz");
        let mut contents = String::new();
        tier.get(&path)
            .expect("winning tier holds the object")
            .read_to_string(&mut contents)
            .expect("readable");
        assert_eq!(contents, "c");
    }

    #[test]
    fn find_tools_falls_back_on_not_found_only() {
        let private = MemoryStorage::new();
        let public = MemoryStorage::new();
        public.insert("tools/drover-1.4.0-precise-amd64.tgz", b"mirror");
        let (tier, path) = find_tools(&private, &public, &spec("1.0.0", "precise", "amd64"))
            .expect("public tier has a match");
        assert_eq!(path, "tools/drover-1.4.0-precise-amd64.tgz");
        assert_eq!(public.list_calls(), 1);
        assert!(tier.get(&path).is_ok());
    }

    #[test]
    fn find_tools_does_not_mask_private_tier_failures() {
        let private = MemoryStorage::new();
        private.fail_next_list(StorageError::Backend {
            reason: "credentials rejected".to_owned(),
        });
        let public = MemoryStorage::new();
        public.insert("tools/drover-1.4.0-precise-amd64.tgz", b"mirror");

        let err = find_tools(&private, &public, &spec("1.0.0", "precise", "amd64"))
            .err()
            .expect("unhealthy private tier is fatal");
        assert!(!err.is_not_found());
        // The public tier must not have been consulted.
        assert_eq!(public.list_calls(), 0);
    }

    #[test]
    fn find_tools_against_empty_tiers_is_not_found() {
        let result = find_tools(&EmptyStorage, &EmptyStorage, &spec("1.0.0", "precise", "amd64"));
        assert!(result.err().expect("nothing anywhere").is_not_found());
    }
}
