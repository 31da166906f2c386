//! Fetching and safely materialising published tools archives.
//!
//! The fetcher streams an archive end to end: HTTP response body into a
//! gzip decoder into a tar reader, one record at a time, with no full
//! buffering. Every record name is validated segment by segment before
//! anything is written, so a hostile archive cannot escape the destination
//! directory. Extraction is deliberately non-atomic: records written before
//! a mid-stream failure survive, and the caller, which owns the fresh
//! destination directory, is responsible for discarding it on error.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path};
use std::sync::OnceLock;
use std::time::Duration;

use flate2::read::GzDecoder;
use thiserror::Error;

/// Network timeout for tools downloads.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors arising while fetching or extracting a tools archive.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL answered 404.
    #[error("tools not found at {url}")]
    NotFound {
        /// The URL that was requested.
        url: String,
    },

    /// The HTTP request failed for any other reason.
    #[error("fetching {url} failed: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// A record name would escape the destination directory.
    #[error("unsafe entry name {name:?} in tools archive")]
    UnsafeEntryName {
        /// The offending record name.
        name: String,
    },

    /// Writing one extracted record failed.
    #[error("extracting {name:?} failed")]
    Extract {
        /// The record being written.
        name: String,
        /// The underlying write failure.
        #[source]
        source: io::Error,
    },

    /// Reading the archive stream failed.
    #[error("reading tools archive failed: {0}")]
    Io(#[from] io::Error),
}

/// Download the archive at `url` and materialise it into `dest_dir`.
///
/// `dest_dir` must already exist. Record modes keep only their low
/// permission bits. Reaching the end of the tar stream terminates
/// successfully; any other failure aborts immediately without rolling back
/// records already written.
///
/// # Errors
///
/// Returns [`FetchError::NotFound`] or [`FetchError::Http`] for transport
/// failures, and any [`extract_tools`] error for archive failures.
pub fn get_tools(url: &str, dest_dir: &Path) -> Result<(), FetchError> {
    log::debug!("fetching tools from {url}");
    let response = http_agent()
        .get(url)
        .call()
        .map_err(|err| map_ureq_error(url, &err))?;
    let mut body = response.into_body();
    extract_tools(body.as_reader(), dest_dir)
}

/// Decompress and extract a gzipped tar stream into `dest_dir`.
///
/// The streaming core of [`get_tools`], separated so archive handling can
/// be exercised without a network.
///
/// # Errors
///
/// Returns [`FetchError::UnsafeEntryName`] for a record that would escape
/// `dest_dir` (nothing is written for it), [`FetchError::Extract`] when a
/// record cannot be written, or [`FetchError::Io`] when the stream itself
/// cannot be read.
pub fn extract_tools<R: Read>(stream: R, dest_dir: &Path) -> Result<(), FetchError> {
    let decoder = GzDecoder::new(stream);
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.into_owned();
        validate_entry_name(&name)?;
        let mode = entry.header().mode()? & 0o777;
        write_record(dest_dir, &name, mode, &mut entry)?;
    }
    Ok(())
}

/// Write one validated record under the destination directory.
fn write_record(
    dest_dir: &Path,
    name: &Path,
    mode: u32,
    record: &mut dyn Read,
) -> Result<(), FetchError> {
    let wrap = |source: io::Error| FetchError::Extract {
        name: name.display().to_string(),
        source,
    };
    let dest = dest_dir.join(name);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    let mut file = create_with_mode(&dest, mode).map_err(wrap)?;
    io::copy(record, &mut file).map_err(wrap)?;
    Ok(())
}

/// Reject record names that could land outside the destination.
///
/// Validation is segment by segment: absolute names and any parent-dir
/// component are refused outright, rather than pattern-matching on the
/// name text.
fn validate_entry_name(name: &Path) -> Result<(), FetchError> {
    let escapes = name.is_absolute()
        || name
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(FetchError::UnsafeEntryName {
            name: name.display().to_string(),
        });
    }
    Ok(())
}

/// Create a file carrying only the record's low permission bits.
#[cfg(unix)]
fn create_with_mode(path: &Path, mode: u32) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
}

/// Non-Unix hosts have no mode bits to apply.
#[cfg(not(unix))]
fn create_with_mode(path: &Path, _mode: u32) -> io::Result<fs::File> {
    fs::File::create(path)
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(FETCH_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`FetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(404) => FetchError::NotFound {
            url: url.to_owned(),
        },
        other => FetchError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
