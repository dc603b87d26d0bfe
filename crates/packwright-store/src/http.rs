//! HTTP backends
//!
//! `HttpBlobStore` reads blobs from a public base URL and writes them through
//! an authenticated PUT endpoint, matching how hosted blob services expose
//! public-read / token-write buckets. `HttpSource` fetches upstream inputs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::storage_traits::{validate_key, BlobStore, PutReceipt, RemoteSource, StoreResult};

const USER_AGENT: &str = concat!("packwright/", env!("CARGO_PKG_VERSION"));

/// Default per-request budget, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP blob store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpStoreConfig {
    /// Base URL blobs are publicly readable from
    pub public_base_url: String,
    /// Base URL accepting authenticated PUT uploads
    pub api_url: String,
    /// Write token (optional for unauthenticated development stores)
    pub token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl HttpStoreConfig {
    /// Create config for a specific pair of endpoints
    pub fn new(public_base_url: &str, api_url: &str) -> Self {
        HttpStoreConfig {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - PACKWRIGHT_BLOB_PUBLIC_URL (required)
    /// - PACKWRIGHT_BLOB_API_URL (optional, defaults to the public URL)
    /// - PACKWRIGHT_BLOB_TOKEN (optional)
    /// - PACKWRIGHT_BLOB_TIMEOUT_SECS (optional, default: 30)
    pub fn from_env() -> std::result::Result<Self, String> {
        let public_base_url = std::env::var("PACKWRIGHT_BLOB_PUBLIC_URL")
            .map_err(|_| "PACKWRIGHT_BLOB_PUBLIC_URL not set")?;
        let api_url =
            std::env::var("PACKWRIGHT_BLOB_API_URL").unwrap_or_else(|_| public_base_url.clone());
        let timeout_secs = std::env::var("PACKWRIGHT_BLOB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let mut config = Self::new(&public_base_url, &api_url);
        config.token = std::env::var("PACKWRIGHT_BLOB_TOKEN").ok();
        config.timeout_secs = timeout_secs;
        Ok(config)
    }

    /// Set the write token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Public URL for a key
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

fn build_client(timeout_secs: u64) -> StoreResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(StoreError::from)
}

fn map_send_error(err: reqwest::Error, key: &str, timeout_secs: u64) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout {
            key: key.to_string(),
            secs: timeout_secs,
        }
    } else {
        StoreError::Http(err.to_string())
    }
}

/// Blob store backed by a public-read / token-write HTTP bucket
pub struct HttpBlobStore {
    config: HttpStoreConfig,
    http_client: reqwest::Client,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

impl HttpBlobStore {
    /// Create a new HTTP blob store
    pub fn new(config: HttpStoreConfig) -> StoreResult<Self> {
        let http_client = build_client(config.timeout_secs)?;
        Ok(HttpBlobStore {
            config,
            http_client,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        let config = HttpStoreConfig::from_env().map_err(StoreError::Unavailable)?;
        Self::new(config)
    }

    /// Configuration in use
    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        validate_key(key)?;
        let url = self.config.public_url(key);
        debug!(%url, "Fetching blob");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| map_send_error(e, key, self.config.timeout_secs))?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            status => Err(StoreError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StoreResult<PutReceipt> {
        validate_key(key)?;
        let size = data.len() as u64;
        let endpoint = format!("{}/{}", self.config.api_url, key);
        debug!(%endpoint, size, "Uploading blob");

        let mut request = self
            .http_client
            .put(&endpoint)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-allow-overwrite", "1")
            .body(data);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_send_error(e, key, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            warn!(key, status = status.as_u16(), "Blob upload rejected");
            return Err(StoreError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        // Some backends echo the public URL; fall back to the configured layout.
        let body = response.bytes().await.unwrap_or_default();
        let url = serde_json::from_slice::<UploadResponse>(&body)
            .ok()
            .and_then(|r| r.url)
            .unwrap_or_else(|| self.config.public_url(key));

        Ok(PutReceipt {
            key: key.to_string(),
            url,
            size,
        })
    }
}

/// Plain HTTP GET source for upstream archives and documents
pub struct HttpSource {
    timeout_secs: u64,
    http_client: reqwest::Client,
}

impl HttpSource {
    /// Create a source with the given per-request timeout
    pub fn new(timeout_secs: u64) -> StoreResult<Self> {
        Ok(HttpSource {
            timeout_secs,
            http_client: build_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn fetch(&self, url: &str) -> StoreResult<Vec<u8>> {
        debug!(%url, "Fetching source");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| map_send_error(e, url, self.timeout_secs))?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                key: url.to_string(),
            }),
            status => Err(StoreError::Status {
                key: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_trims_trailing_slash() {
        let config = HttpStoreConfig::new("https://blob.example.com/", "https://api.example.com/");
        assert_eq!(config.public_base_url, "https://blob.example.com");
        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_config_public_url() {
        let config = HttpStoreConfig::new("https://blob.example.com", "https://api.example.com");
        assert_eq!(
            config.public_url("resource-pack/change.txt"),
            "https://blob.example.com/resource-pack/change.txt"
        );
    }

    #[test]
    fn test_config_with_token_and_timeout() {
        let config = HttpStoreConfig::new("https://a", "https://b")
            .with_token("secret-token")
            .with_timeout_secs(5);
        assert_eq!(config.token, Some("secret-token".to_string()));
        assert_eq!(config.timeout_secs, 5);
    }

    #[tokio::test]
    async fn test_get_rejects_invalid_key_before_network() {
        let store = HttpBlobStore::new(HttpStoreConfig::new("http://127.0.0.1:9", "http://127.0.0.1:9"))
            .unwrap();
        let err = store.get("../escape").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey { .. }));
    }
}
