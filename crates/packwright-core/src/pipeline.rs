//! Build pipeline orchestration.
//!
//! [`BuildPipeline::run`] executes one build end to end:
//!
//! 1. fetch metadata and source archive concurrently (fatal on failure)
//! 2. normalize the archive and fingerprint it
//! 3. load previous state concurrently (degrades to a baseline)
//! 4. diff, digest the source tree, derive the version
//! 5. render the changelog block and prepend it to history
//! 6. package the artifact with generated files
//! 7. publish every record concurrently (best effort)
//! 8. notify (best effort)
//!
//! Fatal errors return before anything is published.

use std::sync::Arc;
use std::time::{Duration, Instant};

use packwright_store::{BlobStore, RemoteSource};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::archive::normalize;
use crate::changelog;
use crate::config::PipelineConfig;
use crate::diff::{diff_snapshots, ChangeSet};
use crate::domain::{BuildError, FileDigest, Result, VersionCode, VersionRecord};
use crate::fingerprint::{build_digest, fingerprint};
use crate::notify::{BuildSummary, Notifier, NotifyReport};
use crate::obs;
use crate::packager::{package, GeneratedFiles, PackMetadata};
use crate::previous::{PreviousReport, PreviousState};
use crate::publish::{PublishBundle, PublishReport, PublishTarget, Publisher};

/// Value returned to the caller and fed to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    /// SHA-1 of the published artifact bytes
    pub artifact_digest: FileDigest,
    /// SHA-1 of the source tree serialization; source of the version tag
    pub build_digest: FileDigest,
    pub version: VersionCode,
    pub previous_version: VersionCode,
    /// Number of source files, excluding generated ones
    pub file_count: usize,
    /// Size of the published artifact
    pub size_bytes: u64,
    pub changes: ChangeSet,
    /// Source paths replaced by generated files
    pub overridden: Vec<String>,
}

/// Everything a build produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub result: BuildResult,
    pub publish: PublishReport,
    pub previous: PreviousReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<NotifyReport>,
}

/// Compact result printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub artifact_digest: FileDigest,
    pub version: VersionCode,
    pub file_count: usize,
    pub size_bytes: u64,
    #[serde(rename = "artifactURL")]
    pub artifact_url: Option<String>,
    #[serde(rename = "changelogURL")]
    pub changelog_url: Option<String>,
    #[serde(rename = "versionURL")]
    pub version_url: Option<String>,
}

impl BuildOutcome {
    pub fn output(&self) -> BuildOutput {
        BuildOutput {
            artifact_digest: self.result.artifact_digest,
            version: self.result.version.clone(),
            file_count: self.result.file_count,
            size_bytes: self.result.size_bytes,
            artifact_url: self.publish.artifact_url().map(str::to_string),
            changelog_url: self
                .publish
                .url(PublishTarget::Changelog)
                .map(str::to_string),
            version_url: self.publish.url(PublishTarget::Version).map(str::to_string),
        }
    }
}

/// One configured build pipeline. Each `run` is independent.
pub struct BuildPipeline {
    config: PipelineConfig,
    source: Arc<dyn RemoteSource>,
    state_store: Arc<dyn BlobStore>,
    artifact_store: Arc<dyn BlobStore>,
    notifier: Option<Notifier>,
}

impl BuildPipeline {
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn RemoteSource>,
        state_store: Arc<dyn BlobStore>,
        artifact_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config,
            source,
            state_store,
            artifact_store,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one build.
    ///
    /// # Errors
    ///
    /// Only fatal conditions: a source fetch failure, an unusable archive or
    /// metadata document, or a local serialization failure. Previous-state,
    /// publish and notification problems are reported on the outcome.
    pub async fn run(&self) -> Result<BuildOutcome> {
        let build_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let outcome = self
            .execute(&build_id)
            .instrument(obs::build_span(&build_id))
            .await;

        match &outcome {
            Ok(outcome) => obs::emit_build_finished(
                &outcome.result.version,
                outcome.result.file_count,
                outcome.result.size_bytes,
                started.elapsed().as_millis() as u64,
            ),
            Err(e) => obs::emit_build_failed(e),
        }
        outcome
    }

    async fn execute(&self, build_id: &str) -> Result<BuildOutcome> {
        obs::emit_build_started(build_id, &self.config.archive_source_url);
        let timeout = self.config.fetch_timeout();

        let (metadata_bytes, archive_bytes) = tokio::try_join!(
            self.fetch_source("metadata", &self.config.metadata_source_url, timeout),
            self.fetch_source("archive", &self.config.archive_source_url, timeout),
        )?;
        obs::emit_sources_fetched(archive_bytes.len(), metadata_bytes.len());

        let metadata = PackMetadata::parse(&metadata_bytes)?;
        let tree = normalize(&archive_bytes)?;
        let current = fingerprint(&tree);

        let previous = PreviousState::load(&*self.state_store, &self.config.keys, timeout).await;

        let changes = diff_snapshots(&previous.baseline_snapshot(), &current);
        let build = build_digest(&tree)?;
        let previous_version = previous.baseline_version();
        let version = self
            .config
            .version_policy
            .derive(&previous_version, changes.magnitude(), &build.digest)
            .ok_or_else(|| BuildError::VersionExhausted {
                previous: previous_version.to_string(),
            })?;
        obs::emit_version_derived(&previous_version, &version, &changes);

        let block = changelog::render(&version, &changes);
        let history = changelog::prepend(&block, previous.history());

        let generated = GeneratedFiles::new(&metadata, &version, &history)?;
        let artifact = package(&tree, &generated)?;
        obs::emit_artifact_packaged(
            &artifact.digest.to_hex(),
            artifact.entry_count,
            artifact.size_bytes(),
            artifact.overridden.len(),
        );

        let record = VersionRecord::new(version.clone(), tree.len(), build.digest);
        let result = BuildResult {
            artifact_digest: artifact.digest,
            build_digest: build.digest,
            version: version.clone(),
            previous_version: previous_version.clone(),
            file_count: tree.len(),
            size_bytes: artifact.size_bytes(),
            changes,
            overridden: artifact.overridden,
        };

        let bundle = PublishBundle {
            artifact: artifact.bytes,
            snapshot: serde_json::to_vec_pretty(&current)?,
            changelog: history.into_bytes(),
            version: serde_json::to_vec_pretty(&record)?,
            metadata: serde_json::to_vec_pretty(&metadata)?,
        };
        let publish = Publisher::new(
            &*self.state_store,
            &*self.artifact_store,
            &self.config.keys,
            timeout,
        )
        .publish(bundle)
        .await;

        let notify = match &self.notifier {
            Some(notifier) => {
                let summary = BuildSummary::new(previous_version, version, &result.changes);
                Some(notifier.notify(&summary).await)
            }
            None => None,
        };

        Ok(BuildOutcome {
            result,
            publish,
            previous: previous.report(),
            notify,
        })
    }

    async fn fetch_source(&self, what: &'static str, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let request_url = if self.config.cache_bust {
            cache_busted(url, &Uuid::new_v4().to_string())
        } else {
            url.to_string()
        };

        let unavailable = |reason: String| BuildError::SourceUnavailable {
            what,
            url: url.to_string(),
            reason,
        };
        match tokio::time::timeout(timeout, self.source.fetch(&request_url)).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(unavailable(e.to_string())),
            Err(_) => Err(unavailable(format!("timed out after {}s", timeout.as_secs()))),
        }
    }
}

/// Append a `cacheBust` query parameter to `url`.
pub fn cache_busted(url: &str, token: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}cacheBust={token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_bust_appends_query() {
        assert_eq!(
            cache_busted("https://x/pack.zip", "abc"),
            "https://x/pack.zip?cacheBust=abc"
        );
        assert_eq!(
            cache_busted("https://x/pack.zip?ref=main", "abc"),
            "https://x/pack.zip?ref=main&cacheBust=abc"
        );
    }
}
