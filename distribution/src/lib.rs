//! Tool artifact distribution and version resolution for Drover.
//!
//! Every controller and managed node in a Drover deployment runs a set of
//! versioned executable agents ("tools"). This crate is the engine that
//! packages those agents into reproducible archives, publishes them
//! atomically to a storage tier, discovers the best-matching build for a
//! node's compatibility triple across prioritised tiers, and fetches and
//! safely extracts the winning archive.
//!
//! The command-line layer that drives these operations, the safety-policy
//! checks that gate them, and the storage backends themselves live in
//! other Drover components; this crate consumes them through narrow
//! collaborator traits.
//!
//! # Modules
//!
//! - [`bundle`] - Reproducible archiving and atomic publishing
//! - [`context`] - Read-only access to the node's compatibility triple
//! - [`fetch`] - Streaming download and safe extraction
//! - [`naming`] - The canonical tools naming codec
//! - [`resolution`] - Best-match selection and the tiered-fallback protocol
//! - [`storage`] - The storage port and its distinguished error kinds

pub mod bundle;
pub mod context;
pub mod fetch;
pub mod naming;
pub mod resolution;
pub mod storage;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
