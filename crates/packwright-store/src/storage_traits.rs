//! Storage trait definitions for packwright
//!
//! These traits define the two I/O seams of the build pipeline:
//! - `BlobStore`: keyed, overwritable blob storage (snapshots, version
//!   records, changelog history, the published artifact)
//! - `RemoteSource`: read-only fetch of upstream inputs (source archive,
//!   pack metadata)
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// BlobStore: keyed blob storage
// ---------------------------------------------------------------------------

/// Acknowledgement for a completed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutReceipt {
    /// Key the blob was stored under
    pub key: String,
    /// Public URL the blob can be retrieved from
    pub url: String,
    /// Number of bytes written
    pub size: u64,
}

/// Overwritable keyed blob store.
///
/// Guarantees:
/// - `put(key, data)` replaces any previous blob under `key`.
/// - `get(key)` returns the bytes of the latest successful `put`.
/// - `get` on a key that was never written returns `StoreError::NotFound`,
///   never an empty blob.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Write `data` under `key`, overwriting any existing blob.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StoreResult<PutReceipt>;
}

// ---------------------------------------------------------------------------
// RemoteSource: upstream inputs
// ---------------------------------------------------------------------------

/// Read-only access to upstream documents addressed by URL.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the full body at `url`. Non-success responses are errors.
    async fn fetch(&self, url: &str) -> StoreResult<Vec<u8>>;
}

/// Reject keys that are empty or try to climb out of the store root.
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    let escapes = key
        .split('/')
        .any(|segment| segment == ".." || segment == ".");
    if key.is_empty() || key.starts_with('/') || escapes {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}
