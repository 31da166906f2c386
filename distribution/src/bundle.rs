//! Reproducible bundling and atomic publishing of tools archives.
//!
//! A tools bundle is a gzip-compressed tar of the agent executables for one
//! (version, series, arch) triple. Archives are byte-reproducible across
//! build machines: entries are written in name order with a fixed mode and
//! fixed ownership, so two accounts building the same binaries produce the
//! same artifact. Publishing builds the complete archive in memory before
//! the storage tier is contacted, so concurrent readers never observe a
//! partial object.

use crate::context::ToolsContext;
use crate::naming;
use crate::storage::{Storage, StorageError};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;

/// The mode forced onto every archived entry, ignoring the host's umask.
const ARCHIVE_MODE: u32 = 0o755;

/// The owner and group name recorded for every archived entry.
const ARCHIVE_OWNER: &str = "drover";

/// The cargo package whose binaries make up a tools bundle.
const AGENT_PACKAGE: &str = "drover-agents";

/// Errors arising while building or archiving a tools bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A directory entry was a directory, symlink, or other non-file.
    #[error("cannot bundle {}: not a regular file", .path.display())]
    NotRegularFile {
        /// The offending entry.
        path: PathBuf,
    },

    /// A directory entry was a regular file without the owner-execute bit.
    #[error("cannot bundle {}: not executable", .path.display())]
    NotExecutable {
        /// The offending entry.
        path: PathBuf,
    },

    /// The external build collaborator exited unsuccessfully.
    #[error("tools build failed ({status}): {output}")]
    Build {
        /// The collaborator's exit status.
        status: ExitStatus,
        /// The collaborator's combined stdout and stderr.
        output: String,
    },

    /// An I/O failure while enumerating, reading, or compressing.
    #[error("bundling I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors arising from publishing a bundle to a storage tier.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Building the archive failed; the storage tier was never contacted.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// The storage tier rejected the upload.
    #[error("storing tools failed: {0}")]
    Storage(#[from] StorageError),
}

/// The external build collaborator.
///
/// Materialises the agent executables for the current platform into the
/// given directory. Its invocation mechanics are opaque to the bundler;
/// tests substitute deterministic doubles.
#[cfg_attr(test, mockall::automock)]
pub trait ToolsBuilder {
    /// Build the agent binaries into `out_dir`.
    ///
    /// Every file left in `out_dir` ends up in the published archive, so
    /// implementations must leave executables there and nothing else.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Build`] with the collaborator's diagnostic
    /// output attached when the build fails.
    fn build_into(&self, out_dir: &Path) -> Result<(), BundleError>;
}

/// Builds agent binaries with `cargo install`.
#[derive(Debug, Clone)]
pub struct CargoToolsBuilder {
    package: String,
}

impl CargoToolsBuilder {
    /// Create a builder for the given cargo package.
    #[must_use]
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
        }
    }
}

impl Default for CargoToolsBuilder {
    fn default() -> Self {
        Self::new(AGENT_PACKAGE)
    }
}

impl ToolsBuilder for CargoToolsBuilder {
    fn build_into(&self, out_dir: &Path) -> Result<(), BundleError> {
        let output = Command::new("cargo")
            .arg("install")
            .arg("--locked")
            .arg("--bins")
            .arg("--root")
            .arg(out_dir)
            .arg(&self.package)
            .output()?;
        if !output.status.success() {
            return Err(BundleError::Build {
                status: output.status,
                output: combined_output(&output),
            });
        }
        flatten_install_root(out_dir)?;
        Ok(())
    }
}

/// Concatenate a process's stdout and stderr for diagnostics.
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    text
}

/// Rearrange a `cargo install --root` layout into a flat directory.
///
/// cargo writes binaries under `<root>/bin` and leaves registry
/// bookkeeping next to it; the archive must see plain executables only.
fn flatten_install_root(root: &Path) -> io::Result<()> {
    let bin_dir = root.join("bin");
    if bin_dir.is_dir() {
        for entry in fs::read_dir(&bin_dir)? {
            let entry = entry?;
            fs::rename(entry.path(), root.join(entry.file_name()))?;
        }
        fs::remove_dir(&bin_dir)?;
    }
    for bookkeeping in [".crates.toml", ".crates2.json"] {
        let path = root.join(bookkeeping);
        if path.exists() {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Archive the executables in `source_dir` as a gzipped tar into `out`.
///
/// Every immediate entry of `source_dir` must be a regular file with the
/// owner-execute bit set; any directory, symlink, or non-executable file
/// fails the whole operation before a single byte is written. Entries are
/// appended in name order with mode and ownership forced to fixed values.
///
/// # Errors
///
/// Returns [`BundleError::NotRegularFile`] or [`BundleError::NotExecutable`]
/// for an unsuitable entry, or [`BundleError::Io`] on read and write
/// failures. Close failures from either the tar or gzip layer are also
/// reported, innermost first.
pub fn archive<W: Write>(source_dir: &Path, out: W) -> Result<(), BundleError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(source_dir)? {
        entries.push(entry?);
    }
    // read_dir order is platform-dependent; name order keeps archives
    // reproducible.
    entries.sort_by_key(fs::DirEntry::file_name);

    // Validate everything before producing any output.
    for entry in &entries {
        if !entry.file_type()?.is_file() {
            return Err(BundleError::NotRegularFile { path: entry.path() });
        }
        if !is_owner_executable(&entry.metadata()?) {
            return Err(BundleError::NotExecutable { path: entry.path() });
        }
    }

    let encoder = GzEncoder::new(out, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for entry in &entries {
        append_binary(&mut builder, entry)?;
    }
    // Finalise innermost first so neither trailer is lost.
    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Append one executable as a normalised tar record.
fn append_binary<W: Write>(
    builder: &mut tar::Builder<W>,
    entry: &fs::DirEntry,
) -> Result<(), BundleError> {
    let metadata = entry.metadata()?;
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(metadata.len());
    header.set_mode(ARCHIVE_MODE);
    header.set_mtime(modified_epoch_seconds(&metadata));
    header.set_username(ARCHIVE_OWNER)?;
    header.set_groupname(ARCHIVE_OWNER)?;
    let mut file = fs::File::open(entry.path())?;
    builder.append_data(&mut header, entry.file_name(), &mut file)?;
    Ok(())
}

/// Seconds since the epoch of the file's last modification, or zero.
fn modified_epoch_seconds(metadata: &fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(std::time::UNIX_EPOCH).ok())
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Whether the metadata describes a file executable by (at least) its owner.
#[cfg(unix)]
fn is_owner_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o100 != 0
}

/// Non-Unix hosts carry no execute bit; any regular file qualifies.
#[cfg(not(unix))]
fn is_owner_executable(_metadata: &fs::Metadata) -> bool {
    true
}

/// Build the current agent binaries and archive them.
///
/// The build runs in a scratch directory that is removed on every exit
/// path, whether the build or the archiving step fails.
///
/// # Errors
///
/// Returns [`BundleError::Build`] with diagnostics when the collaborator
/// fails, or any [`BundleError`] from [`archive`].
pub fn bundle_tools(builder: &dyn ToolsBuilder) -> Result<Vec<u8>, BundleError> {
    let scratch = tempfile::tempdir()?;
    builder.build_into(scratch.path())?;
    let mut buffer = Vec::new();
    archive(scratch.path(), &mut buffer)?;
    Ok(buffer)
}

/// Build the current tools bundle and upload it at its canonical path.
///
/// The whole archive is built in memory before the storage tier is
/// contacted, then written with a single `put` of the exact size: the tier
/// never observes a partially written artifact, and a build failure never
/// leaves a corrupt object visible to concurrent readers. Returns the
/// canonical path the bundle was published under.
///
/// # Errors
///
/// Returns [`PublishError::Bundle`] if building fails (the tier is never
/// contacted), or [`PublishError::Storage`] if the upload fails.
pub fn put_tools(
    store: &dyn Storage,
    context: &dyn ToolsContext,
    builder: &dyn ToolsBuilder,
) -> Result<String, PublishError> {
    let bytes = bundle_tools(builder)?;
    let path = naming::tools_path(&context.version(), &context.series(), &context.arch());
    log::debug!("publishing tools to {path:?} ({} bytes)", bytes.len());
    let length = bytes.len() as u64;
    store.put(&path, &mut bytes.as_slice(), length)?;
    Ok(path)
}
