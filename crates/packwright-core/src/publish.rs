//! Concurrent best-effort publishing.
//!
//! Every target is written independently. A failed write is recorded in the
//! [`PublishReport`] and never rolls back the others.

use std::fmt;
use std::time::Duration;

use futures::future::join_all;
use packwright_store::BlobStore;
use serde::{Deserialize, Serialize};

use crate::config::StoreKeys;
use crate::obs;

pub const CONTENT_TYPE_ZIP: &str = "application/zip";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Record written at the end of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishTarget {
    Artifact,
    Snapshot,
    Changelog,
    Version,
    Metadata,
}

impl PublishTarget {
    pub const ALL: [PublishTarget; 5] = [
        PublishTarget::Artifact,
        PublishTarget::Snapshot,
        PublishTarget::Changelog,
        PublishTarget::Version,
        PublishTarget::Metadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishTarget::Artifact => "artifact",
            PublishTarget::Snapshot => "snapshot",
            PublishTarget::Changelog => "changelog",
            PublishTarget::Version => "version",
            PublishTarget::Metadata => "metadata",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            PublishTarget::Artifact => CONTENT_TYPE_ZIP,
            PublishTarget::Changelog => CONTENT_TYPE_TEXT,
            PublishTarget::Snapshot | PublishTarget::Version | PublishTarget::Metadata => {
                CONTENT_TYPE_JSON
            }
        }
    }

    pub fn key<'k>(&self, keys: &'k StoreKeys) -> &'k str {
        match self {
            PublishTarget::Artifact => &keys.artifact,
            PublishTarget::Snapshot => &keys.snapshot,
            PublishTarget::Changelog => &keys.changelog,
            PublishTarget::Version => &keys.version,
            PublishTarget::Metadata => &keys.metadata,
        }
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishStatus {
    Published { url: String, size: u64 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub target: PublishTarget,
    pub key: String,
    #[serde(flatten)]
    pub status: PublishStatus,
}

impl PublishOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, PublishStatus::Published { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match &self.status {
            PublishStatus::Published { url, .. } => Some(url),
            PublishStatus::Failed { .. } => None,
        }
    }
}

/// Per-target publish results, in [`PublishTarget::ALL`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub outcomes: Vec<PublishOutcome>,
}

impl PublishReport {
    pub fn get(&self, target: PublishTarget) -> Option<&PublishOutcome> {
        self.outcomes.iter().find(|o| o.target == target)
    }

    pub fn url(&self, target: PublishTarget) -> Option<&str> {
        self.get(target).and_then(PublishOutcome::url)
    }

    pub fn artifact_url(&self) -> Option<&str> {
        self.url(PublishTarget::Artifact)
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(PublishOutcome::succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PublishOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

/// Serialized bodies for every publish target.
#[derive(Debug, Clone)]
pub struct PublishBundle {
    pub artifact: Vec<u8>,
    pub snapshot: Vec<u8>,
    pub changelog: Vec<u8>,
    pub version: Vec<u8>,
    pub metadata: Vec<u8>,
}

impl PublishBundle {
    fn body_mut(&mut self, target: PublishTarget) -> &mut Vec<u8> {
        match target {
            PublishTarget::Artifact => &mut self.artifact,
            PublishTarget::Snapshot => &mut self.snapshot,
            PublishTarget::Changelog => &mut self.changelog,
            PublishTarget::Version => &mut self.version,
            PublishTarget::Metadata => &mut self.metadata,
        }
    }

    fn into_parts(mut self) -> [(PublishTarget, Vec<u8>); 5] {
        PublishTarget::ALL.map(|target| (target, std::mem::take(self.body_mut(target))))
    }
}

/// Writes the artifact to the artifact store and every other record to the
/// state store.
pub struct Publisher<'a> {
    state_store: &'a dyn BlobStore,
    artifact_store: &'a dyn BlobStore,
    keys: &'a StoreKeys,
    timeout: Duration,
}

impl<'a> Publisher<'a> {
    pub fn new(
        state_store: &'a dyn BlobStore,
        artifact_store: &'a dyn BlobStore,
        keys: &'a StoreKeys,
        timeout: Duration,
    ) -> Self {
        Self {
            state_store,
            artifact_store,
            keys,
            timeout,
        }
    }

    fn store_for(&self, target: PublishTarget) -> &'a dyn BlobStore {
        match target {
            PublishTarget::Artifact => self.artifact_store,
            _ => self.state_store,
        }
    }

    /// Write all targets concurrently and collect every outcome.
    pub async fn publish(&self, bundle: PublishBundle) -> PublishReport {
        let writes = bundle
            .into_parts()
            .into_iter()
            .map(|(target, data)| self.put(target, data));
        PublishReport {
            outcomes: join_all(writes).await,
        }
    }

    async fn put(&self, target: PublishTarget, data: Vec<u8>) -> PublishOutcome {
        let key = target.key(self.keys);
        let write = self
            .store_for(target)
            .put(key, data, target.content_type());

        let status = match tokio::time::timeout(self.timeout, write).await {
            Ok(Ok(receipt)) => PublishStatus::Published {
                url: receipt.url,
                size: receipt.size,
            },
            Ok(Err(e)) => PublishStatus::Failed {
                error: e.to_string(),
            },
            Err(_) => PublishStatus::Failed {
                error: format!("timed out after {}s", self.timeout.as_secs()),
            },
        };
        if let PublishStatus::Failed { error } = &status {
            obs::emit_publish_failed(target.as_str(), key, error);
        }

        PublishOutcome {
            target,
            key: key.to_string(),
            status,
        }
    }
}
