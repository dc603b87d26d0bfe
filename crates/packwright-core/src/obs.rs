//! Structured lifecycle events for a build.
//!
//! Every build runs instrumented with a [`build_span`] tagged with a fresh
//! build id. The `emit_*` functions log one `info!` (or `warn!`) line per lifecycle step
//! with a stable `event` field so log pipelines can key on it.

use tracing::{info, warn};

use crate::diff::ChangeSet;
use crate::domain::VersionCode;

/// Span carrying the build id. Attach it to the build future with
/// `tracing::Instrument`.
pub fn build_span(build_id: &str) -> tracing::Span {
    tracing::info_span!("packwright.build", build_id = %build_id)
}

pub fn emit_build_started(build_id: &str, archive_url: &str) {
    info!(event = "build.started", build_id = %build_id, archive_url = %archive_url);
}

pub fn emit_sources_fetched(archive_bytes: usize, metadata_bytes: usize) {
    info!(
        event = "build.sources_fetched",
        archive_bytes = archive_bytes,
        metadata_bytes = metadata_bytes,
    );
}

/// A previous-state record could not be used. The build continues from a
/// baseline for that record.
pub fn emit_previous_degraded(record: &str, reason: &str) {
    warn!(event = "build.previous_degraded", record = %record, reason = %reason);
}

pub fn emit_version_derived(previous: &VersionCode, next: &VersionCode, changes: &ChangeSet) {
    info!(
        event = "build.version_derived",
        previous = %previous,
        version = %next,
        added = changes.added.len(),
        removed = changes.removed.len(),
        modified = changes.modified.len(),
    );
}

pub fn emit_artifact_packaged(digest: &str, entry_count: usize, size_bytes: u64, overridden: usize) {
    info!(
        event = "build.artifact_packaged",
        digest = %digest,
        entry_count = entry_count,
        size_bytes = size_bytes,
        overridden = overridden,
    );
}

pub fn emit_publish_failed(target: &str, key: &str, error: &dyn std::fmt::Display) {
    warn!(event = "build.publish_failed", target = %target, key = %key, error = %error);
}

pub fn emit_notify_failed(error: &dyn std::fmt::Display) {
    warn!(event = "build.notify_failed", error = %error);
}

pub fn emit_build_finished(version: &VersionCode, file_count: usize, size_bytes: u64, duration_ms: u64) {
    info!(
        event = "build.finished",
        version = %version,
        file_count = file_count,
        size_bytes = size_bytes,
        duration_ms = duration_ms,
    );
}

pub fn emit_build_failed(error: &dyn std::fmt::Display) {
    warn!(event = "build.failed", error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn events_inside_build_span_carry_build_id() {
        let span = build_span("test-build");
        let _entered = span.enter();
        emit_version_derived(
            &VersionCode::baseline(),
            &VersionCode::baseline(),
            &ChangeSet::default(),
        );

        assert!(logs_contain("packwright.build"));
        assert!(logs_contain("test-build"));
    }
}
