//! Shared compatibility model for the Drover cluster platform.
//!
//! Every Drover component that publishes, resolves, or runs agent tool
//! bundles agrees on the same three-part compatibility key: the binary
//! version (whose major component is the compatibility epoch), the
//! OS-release series, and the CPU architecture. This crate provides the
//! validated types for that key.
//!
//! # Modules
//!
//! - [`arch`] - CPU architecture label (`Arch`) and host detection
//! - [`error`] - Semantic error types for model validation failures
//! - [`series`] - OS-release series label (`Series`)
//! - [`version`] - Three-component binary version (`Version`)

pub mod arch;
pub mod error;
pub mod series;
pub mod version;

pub use arch::Arch;
pub use error::{ModelError, Result};
pub use series::Series;
pub use version::Version;
