//! Domain models for packwright.
//!
//! Canonical definitions for the core entities:
//! - `FileDigest`: SHA-1 content digest
//! - `Snapshot`: path → digest map of one build
//! - `VersionCode` / `VersionPolicy`: monotonic versioning
//! - `BuildError`: fatal pipeline errors

pub mod digest;
pub mod error;
pub mod snapshot;
pub mod version;

// Re-export main types and errors
pub use digest::{FileDigest, InvalidDigest};
pub use error::{BuildError, Result, VersionParseError};
pub use snapshot::{FileRecord, Snapshot};
pub use version::{Bump, VersionCode, VersionPolicy, VersionRecord};
