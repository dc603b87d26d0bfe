//! Filesystem-backed blob store
//!
//! Layout: `<root>/<key>`, with `/` in keys mapped to subdirectories.
//! Useful for local builds and dry runs without network credentials.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::storage_traits::{validate_key, BlobStore, PutReceipt, StoreResult};

/// Directory-rooted blob store with atomic overwrites.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a new `FsBlobStore` rooted at `root`. Creates `root` if needed.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn blob_path(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(key
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.blob_path(key)?;
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    key: key.to_string(),
                }
            } else {
                StoreError::Io(e)
            }
        })
    }

    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StoreResult<PutReceipt> {
        let path = self.blob_path(key)?;
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        // Atomic write: write to temp file in the same directory, then rename.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(PutReceipt {
            key: key.to_string(),
            url: format!("file://{}", path.display()),
            size: data.len() as u64,
        })
    }
}
