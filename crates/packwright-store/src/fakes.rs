//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryBlobStore` and `MemorySource` that satisfy the trait
//! contracts without any external dependencies, with per-key fault and
//! latency injection for exercising fallback and partial-failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryBlobStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct BlobState {
    blobs: HashMap<String, Vec<u8>>,
    content_types: HashMap<String, String>,
    failing_gets: HashSet<String>,
    failing_puts: HashSet<String>,
    get_delays: HashMap<String, Duration>,
    put_log: Vec<String>,
}

/// In-memory blob store backed by a `HashMap<key, bytes>`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    state: Mutex<BlobState>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob without going through `put` (not recorded in the put log).
    pub fn insert(&self, key: &str, data: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state.blobs.insert(key.to_string(), data.into());
    }

    /// Make every `get` of `key` fail with `StoreError::Unavailable`.
    pub fn fail_get(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_gets.insert(key.to_string());
    }

    /// Make every `put` of `key` fail with `StoreError::Unavailable`.
    pub fn fail_put(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_puts.insert(key.to_string());
    }

    /// Delay every `get` of `key` by `delay` before answering.
    pub fn delay_get(&self, key: &str, delay: Duration) {
        let mut state = self.state.lock().unwrap();
        state.get_delays.insert(key.to_string(), delay);
    }

    /// Current bytes under `key`, if any.
    pub fn blob(&self, key: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.blobs.get(key).cloned()
    }

    /// Content type recorded by the last successful `put` of `key`.
    pub fn content_type(&self, key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.content_types.get(key).cloned()
    }

    /// Keys of all successful `put` calls, in completion order.
    pub fn put_log(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.put_log.clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let delay = {
            let state = self.state.lock().unwrap();
            state.get_delays.get(key).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if state.failing_gets.contains(key) {
            return Err(StoreError::Unavailable(format!("injected get failure: {key}")));
        }
        state
            .blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StoreResult<PutReceipt> {
        validate_key(key)?;
        let mut state = self.state.lock().unwrap();
        if state.failing_puts.contains(key) {
            return Err(StoreError::Unavailable(format!("injected put failure: {key}")));
        }
        let size = data.len() as u64;
        state.blobs.insert(key.to_string(), data);
        state
            .content_types
            .insert(key.to_string(), content_type.to_string());
        state.put_log.push(key.to_string());
        Ok(PutReceipt {
            key: key.to_string(),
            url: format!("memory://{key}"),
            size,
        })
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SourceState {
    documents: Vec<(String, Vec<u8>)>,
    failing: HashSet<String>,
    requests: Vec<String>,
}

/// In-memory remote source.
///
/// Documents are registered by URL; a request matches when its URL equals the
/// registered one or extends it with a query string, so cache-busting
/// parameters do not need to be predicted by tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    state: Mutex<SourceState>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `data` for `url`.
    pub fn serve(&self, url: &str, data: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state.documents.retain(|(u, _)| u != url);
        state.documents.push((url.to_string(), data.into()));
    }

    /// Make every fetch of `url` fail with `StoreError::Unavailable`.
    pub fn fail(&self, url: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing.insert(url.to_string());
    }

    /// Every URL requested so far, exactly as requested.
    pub fn requests(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.requests.clone()
    }
}

fn matches_url(registered: &str, requested: &str) -> bool {
    requested == registered
        || requested
            .strip_prefix(registered)
            .is_some_and(|rest| rest.starts_with('?') || rest.starts_with('&'))
}

#[async_trait]
impl RemoteSource for MemorySource {
    async fn fetch(&self, url: &str) -> StoreResult<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(url.to_string());
        if state.failing.iter().any(|f| matches_url(f, url)) {
            return Err(StoreError::Unavailable(format!("injected fetch failure: {url}")));
        }
        state
            .documents
            .iter()
            .find(|(registered, _)| matches_url(registered, url))
            .map(|(_, data)| data.clone())
            .ok_or_else(|| StoreError::NotFound {
                key: url.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn source_matches_query_suffix() {
        let source = MemorySource::new();
        source.serve("https://example.com/pack.zip", b"zip".to_vec());

        let body = source
            .fetch("https://example.com/pack.zip?cacheBust=123")
            .await
            .unwrap();
        assert_eq!(body, b"zip");
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn source_does_not_match_longer_path() {
        let source = MemorySource::new();
        source.serve("https://example.com/pack", b"zip".to_vec());

        let err = source
            .fetch("https://example.com/pack.zip")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn blob_store_injected_failures() {
        let store = MemoryBlobStore::new();
        store.insert("version.json", b"{}".to_vec());
        store.fail_get("version.json");
        store.fail_put("change.txt");

        assert!(matches!(
            store.get("version.json").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store
            .put("change.txt", b"x".to_vec(), "text/plain")
            .await
            .is_err());
        assert!(store.put_log().is_empty());
    }
}
