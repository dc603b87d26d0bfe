//! Previously published state.
//!
//! The snapshot, version record and changelog history from the last build
//! are loaded concurrently. Each record resolves independently to a
//! [`Prior`]: found, absent (never published) or unavailable (fetch error,
//! timeout, or undecodable body). Absent and unavailable both fall back to a
//! cold-start baseline, but stay distinguishable for logs and callers.

use std::fmt;
use std::time::Duration;

use packwright_store::BlobStore;
use serde::{Deserialize, Serialize};

use crate::config::StoreKeys;
use crate::domain::{Snapshot, VersionCode, VersionRecord};
use crate::obs;

/// Resolution of one previously published record.
#[derive(Debug, Clone, PartialEq)]
pub enum Prior<T> {
    Found(T),
    /// Never published
    Absent,
    /// Published state could not be read; carries the reason
    Unavailable(String),
}

impl<T> Prior<T> {
    pub fn found(&self) -> Option<&T> {
        match self {
            Prior::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Prior::Found(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Prior::Unavailable(_))
    }

    /// Decode a found value; a decode failure makes the record unavailable.
    pub fn decode<U, E, F>(self, f: F) -> Prior<U>
    where
        F: FnOnce(T) -> Result<U, E>,
        E: fmt::Display,
    {
        match self {
            Prior::Found(value) => match f(value) {
                Ok(decoded) => Prior::Found(decoded),
                Err(e) => Prior::Unavailable(format!("undecodable: {e}")),
            },
            Prior::Absent => Prior::Absent,
            Prior::Unavailable(reason) => Prior::Unavailable(reason),
        }
    }

    pub fn status(&self) -> PriorStatus {
        match self {
            Prior::Found(_) => PriorStatus::Found,
            Prior::Absent => PriorStatus::Absent,
            Prior::Unavailable(reason) => PriorStatus::Unavailable {
                reason: reason.clone(),
            },
        }
    }
}

/// Serializable form of a [`Prior`] without its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PriorStatus {
    Found,
    Absent,
    Unavailable { reason: String },
}

/// How each previous record was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousReport {
    pub snapshot: PriorStatus,
    pub version: PriorStatus,
    pub changelog: PriorStatus,
}

/// Previous build's published state.
#[derive(Debug, Clone)]
pub struct PreviousState {
    pub snapshot: Prior<Snapshot>,
    pub version: Prior<VersionRecord>,
    pub changelog: Prior<String>,
}

impl PreviousState {
    /// Load all three records concurrently, each bounded by `timeout`.
    ///
    /// Never fails; problems degrade the affected record only.
    pub async fn load(store: &dyn BlobStore, keys: &StoreKeys, timeout: Duration) -> Self {
        let (snapshot, version, changelog) = tokio::join!(
            fetch(store, &keys.snapshot, timeout),
            fetch(store, &keys.version, timeout),
            fetch(store, &keys.changelog, timeout),
        );

        let state = Self {
            snapshot: snapshot.decode(|bytes| serde_json::from_slice::<Snapshot>(&bytes)),
            version: version.decode(|bytes| serde_json::from_slice::<VersionRecord>(&bytes)),
            changelog: changelog.decode(String::from_utf8),
        };

        for (record, reason) in state.degraded() {
            obs::emit_previous_degraded(record, reason);
        }
        state
    }

    /// Snapshot to diff against; empty unless found.
    pub fn baseline_snapshot(&self) -> Snapshot {
        self.snapshot.found().cloned().unwrap_or_default()
    }

    /// Version to derive from; `0-0-0-init` unless found.
    pub fn baseline_version(&self) -> VersionCode {
        self.version
            .found()
            .map(|record| record.version.clone())
            .unwrap_or_else(VersionCode::baseline)
    }

    /// Changelog history to prepend to; empty unless found.
    pub fn history(&self) -> &str {
        self.changelog.found().map(String::as_str).unwrap_or("")
    }

    /// True when every record was never published.
    pub fn is_cold_start(&self) -> bool {
        matches!(
            (&self.snapshot, &self.version, &self.changelog),
            (Prior::Absent, Prior::Absent, Prior::Absent)
        )
    }

    /// Records that were published but could not be read.
    pub fn degraded(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        if let Prior::Unavailable(reason) = &self.snapshot {
            out.push(("snapshot", reason.as_str()));
        }
        if let Prior::Unavailable(reason) = &self.version {
            out.push(("version", reason.as_str()));
        }
        if let Prior::Unavailable(reason) = &self.changelog {
            out.push(("changelog", reason.as_str()));
        }
        out
    }

    pub fn report(&self) -> PreviousReport {
        PreviousReport {
            snapshot: self.snapshot.status(),
            version: self.version.status(),
            changelog: self.changelog.status(),
        }
    }
}

async fn fetch(store: &dyn BlobStore, key: &str, timeout: Duration) -> Prior<Vec<u8>> {
    match tokio::time::timeout(timeout, store.get(key)).await {
        Ok(Ok(bytes)) => Prior::Found(bytes),
        Ok(Err(e)) if e.is_not_found() => Prior::Absent,
        Ok(Err(e)) => Prior::Unavailable(e.to_string()),
        Err(_) => Prior::Unavailable(format!("timed out after {}s", timeout.as_secs())),
    }
}
