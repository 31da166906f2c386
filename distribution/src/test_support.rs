//! Deterministic test doubles for the distribution engine.
//!
//! Exposed behind the `test-support` feature so external test suites can
//! exercise resolution, publishing, and fetching without a real storage
//! backend or build toolchain. Records expected interactions and supports
//! primed failures, in the spirit of a scripted stub rather than a mock
//! framework.

use crate::bundle::{BundleError, ToolsBuilder};
use crate::storage::{Storage, StorageError};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::process::ExitStatus;

/// An in-memory storage tier.
///
/// Objects live in a sorted map; listings are prefix filters over the key
/// space. Each port method counts its invocations so tests can assert on
/// protocol behaviour (for example, that a tier was never consulted), and
/// `list` and `url` can be primed to fail.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RefCell<BTreeMap<String, Vec<u8>>>,
    list_failure: RefCell<Option<StorageError>>,
    url_failures: RefCell<BTreeSet<String>>,
    list_calls: Cell<usize>,
    get_calls: Cell<usize>,
    put_calls: Cell<usize>,
    url_calls: Cell<usize>,
}

impl MemoryStorage {
    /// Create an empty in-memory tier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly, bypassing the port.
    pub fn insert(&self, name: &str, contents: &[u8]) {
        self.objects
            .borrow_mut()
            .insert(name.to_owned(), contents.to_vec());
    }

    /// Return a stored object's bytes, if present.
    #[must_use]
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.borrow().get(name).cloned()
    }

    /// Prime the next `list` call to fail with `error`.
    pub fn fail_next_list(&self, error: StorageError) {
        *self.list_failure.borrow_mut() = Some(error);
    }

    /// Make `url` fail for the named object.
    pub fn fail_url_for(&self, name: &str) {
        self.url_failures.borrow_mut().insert(name.to_owned());
    }

    /// How many times `list` has been called.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    /// How many times `get` has been called.
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.get_calls.get()
    }

    /// How many times `put` has been called.
    #[must_use]
    pub fn put_calls(&self) -> usize {
        self.put_calls.get()
    }

    /// How many times `url` has been called.
    #[must_use]
    pub fn url_calls(&self) -> usize {
        self.url_calls.get()
    }
}

impl Storage for MemoryStorage {
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.list_calls.set(self.list_calls.get() + 1);
        if let Some(error) = self.list_failure.borrow_mut().take() {
            return Err(error);
        }
        Ok(self
            .objects
            .borrow()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn get(&self, name: &str) -> Result<Box<dyn Read>, StorageError> {
        self.get_calls.set(self.get_calls.get() + 1);
        match self.objects.borrow().get(name) {
            Some(contents) => Ok(Box::new(Cursor::new(contents.clone()))),
            None => Err(StorageError::NotFound {
                name: name.to_owned(),
            }),
        }
    }

    fn put(&self, name: &str, data: &mut dyn Read, length: u64) -> Result<(), StorageError> {
        self.put_calls.set(self.put_calls.get() + 1);
        let mut contents = Vec::new();
        data.read_to_end(&mut contents)?;
        if contents.len() as u64 != length {
            return Err(StorageError::Backend {
                reason: format!("declared {length} bytes but received {}", contents.len()),
            });
        }
        self.objects.borrow_mut().insert(name.to_owned(), contents);
        Ok(())
    }

    fn url(&self, name: &str) -> Result<String, StorageError> {
        self.url_calls.set(self.url_calls.get() + 1);
        if self.url_failures.borrow().contains(name) {
            return Err(StorageError::Backend {
                reason: format!("no URL available for {name}"),
            });
        }
        if self.objects.borrow().contains_key(name) {
            Ok(format!("memory:///{name}"))
        } else {
            Err(StorageError::NotFound {
                name: name.to_owned(),
            })
        }
    }
}

/// A build collaborator that writes scripted files instead of compiling.
#[derive(Debug, Default)]
pub struct StubBuilder {
    files: Vec<(String, Vec<u8>)>,
    failure: RefCell<Option<BundleError>>,
}

impl StubBuilder {
    /// A builder that materialises the given executables.
    #[must_use]
    pub fn with_files(files: &[(&str, &[u8])]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, contents)| ((*name).to_owned(), contents.to_vec()))
                .collect(),
            failure: RefCell::new(None),
        }
    }

    /// A builder whose next invocation fails with `error`.
    #[must_use]
    pub fn failing(error: BundleError) -> Self {
        Self {
            files: Vec::new(),
            failure: RefCell::new(Some(error)),
        }
    }
}

impl ToolsBuilder for StubBuilder {
    fn build_into(&self, out_dir: &Path) -> Result<(), BundleError> {
        if let Some(error) = self.failure.borrow_mut().take() {
            return Err(error);
        }
        for (name, contents) in &self.files {
            write_executable(out_dir, name, contents)?;
        }
        Ok(())
    }
}

/// Write an owner-executable file into `dir`.
///
/// # Errors
///
/// Returns any I/O error from writing the file or setting its mode.
pub fn write_executable(dir: &Path, name: &str, contents: &[u8]) -> io::Result<()> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// A ready-made build failure carrying the given diagnostic output.
#[must_use]
pub fn build_failure(output: &str) -> BundleError {
    BundleError::Build {
        status: exit_status(1),
        output: output.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trips_objects() {
        let store = MemoryStorage::new();
        let mut data: &[u8] = b"archive bytes";
        store
            .put("tools/drover-1.0.0-noble-amd64.tgz", &mut data, 13)
            .expect("put succeeds");

        let mut readback = Vec::new();
        store
            .get("tools/drover-1.0.0-noble-amd64.tgz")
            .expect("object exists")
            .read_to_end(&mut readback)
            .expect("readable");
        assert_eq!(readback, b"archive bytes");
        assert_eq!(store.put_calls(), 1);
        assert_eq!(store.get_calls(), 1);
    }

    #[test]
    fn memory_storage_rejects_length_mismatches() {
        let store = MemoryStorage::new();
        let mut data: &[u8] = b"short";
        let err = store
            .put("tools/x", &mut data, 99)
            .expect_err("length mismatch is fatal");
        assert!(!err.is_not_found());
        assert!(store.contents("tools/x").is_none());
    }

    #[test]
    fn memory_storage_lists_by_prefix() {
        let store = MemoryStorage::new();
        store.insert("tools/drover-1.0.0-noble-amd64.tgz", b"a");
        store.insert("tools/drover-2.0.0-noble-amd64.tgz", b"b");
        store.insert("unrelated/object", b"c");

        let names = store.list("tools/drover-1.").expect("list succeeds");
        assert_eq!(names, vec!["tools/drover-1.0.0-noble-amd64.tgz".to_owned()]);
    }
}
