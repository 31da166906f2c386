//! The storage port consumed by resolution and publishing.
//!
//! Drover environments expose their artifact stores through this narrow
//! read/write/list contract; the backends themselves (object stores, file
//! servers, mirrors) live elsewhere and are not reimplemented here. The
//! port recognises one distinguished failure kind, [`StorageError::NotFound`],
//! which resolution treats as a normal outcome licensing tier fallback.
//! Every other kind is an infrastructure failure and is always propagated.

use std::io::Read;
use thiserror::Error;

/// Errors surfaced by a storage tier.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The named object does not exist in the queried tier.
    ///
    /// The only kind that licenses falling back to the next tier; matched
    /// by variant, never by message text.
    #[error("{name} not found")]
    NotFound {
        /// The object name that was requested.
        name: String,
    },

    /// An I/O failure talking to the backend.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend failure.
    #[error("storage backend error: {reason}")]
    Backend {
        /// Description of the failure.
        reason: String,
    },
}

impl StorageError {
    /// Whether this error is the distinguished not-found kind.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound { .. } => true,
            StorageError::Io(_) | StorageError::Backend { .. } => false,
        }
    }
}

/// A prioritised storage tier holding published tools archives.
///
/// Implementations are blocking; callers run them inside their own
/// concurrency context. `put` is expected to be atomic-visible: a reader
/// must never observe a partially written object.
pub trait Storage {
    /// List the names of all objects whose name starts with `prefix`.
    ///
    /// An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the listing itself fails.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Open the named object for reading.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the object does not exist,
    /// or another kind on infrastructure failure.
    fn get(&self, name: &str) -> Result<Box<dyn Read>, StorageError>;

    /// Write `length` bytes from `data` as the named object.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails; the tier must not
    /// leave a partial object visible.
    fn put(&self, name: &str, data: &mut dyn Read, length: u64) -> Result<(), StorageError>;

    /// Resolve the named object to a fetchable URL.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the object does not exist,
    /// or another kind if the tier cannot produce URLs.
    fn url(&self, name: &str) -> Result<String, StorageError>;
}

/// A storage tier that contains nothing.
///
/// Useful as the public tier of environments with no mirror configured,
/// and in tests.
///
/// # Examples
///
/// ```
/// use drover_distribution::storage::{EmptyStorage, Storage};
///
/// assert!(EmptyStorage.list("tools/").expect("list never fails").is_empty());
/// assert!(EmptyStorage.get("tools/x").is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyStorage;

impl Storage for EmptyStorage {
    fn list(&self, _prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(Vec::new())
    }

    fn get(&self, name: &str) -> Result<Box<dyn Read>, StorageError> {
        Err(StorageError::NotFound {
            name: name.to_owned(),
        })
    }

    fn put(&self, _name: &str, _data: &mut dyn Read, _length: u64) -> Result<(), StorageError> {
        Err(StorageError::Backend {
            reason: "empty storage is read-only".to_owned(),
        })
    }

    fn url(&self, name: &str) -> Result<String, StorageError> {
        Err(StorageError::NotFound {
            name: name.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_storage_lists_nothing() {
        let names = EmptyStorage.list("tools/").expect("list never fails");
        assert!(names.is_empty());
    }

    #[test]
    fn empty_storage_get_is_not_found() {
        let err = EmptyStorage
            .get("tools/drover-1.0.0-noble-amd64.tgz")
            .err()
            .expect("empty storage holds nothing");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("tools/drover-1.0.0-noble-amd64.tgz"));
    }

    #[test]
    fn empty_storage_url_is_not_found() {
        let err = EmptyStorage.url("tools/x").expect_err("no URLs");
        assert!(err.is_not_found());
    }

    #[test]
    fn empty_storage_rejects_writes() {
        let mut data: &[u8] = b"bytes";
        let err = EmptyStorage
            .put("tools/x", &mut data, 5)
            .expect_err("read-only");
        assert!(!err.is_not_found());
    }

    #[test]
    fn io_errors_are_not_not_found() {
        let err = StorageError::Io(std::io::Error::other("connection reset"));
        assert!(!err.is_not_found());
    }
}
