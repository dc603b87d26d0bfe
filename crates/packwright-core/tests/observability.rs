//! Observability tests for build lifecycle tracing.
//!
//! These verify that the structured `event` fields downstream log pipelines
//! key on are actually emitted by a pipeline run.

use std::io::{Cursor, Write};
use std::sync::Arc;

use packwright_core::obs::{build_span, emit_build_started, emit_previous_degraded};
use packwright_core::{BuildPipeline, PipelineConfig};
use packwright_store::fakes::{MemoryBlobStore, MemorySource};
use tracing_test::traced_test;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const ARCHIVE_URL: &str = "https://source.example.com/pack.zip";
const METADATA_URL: &str = "https://source.example.com/pack.json";

fn source_zip() -> Vec<u8> {
    let options = SimpleFileOptions::default();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.add_directory("root/", options).unwrap();
    writer.start_file("root/a.txt", options).unwrap();
    writer.write_all(b"a").unwrap();
    writer.finish().unwrap().into_inner()
}

fn pipeline(state: Arc<MemoryBlobStore>) -> (BuildPipeline, Arc<MemorySource>) {
    let source = Arc::new(MemorySource::new());
    source.serve(ARCHIVE_URL, source_zip());
    source.serve(METADATA_URL, b"{}".to_vec());
    let pipeline = BuildPipeline::new(
        PipelineConfig::new(ARCHIVE_URL, METADATA_URL),
        source.clone(),
        state,
        Arc::new(MemoryBlobStore::new()),
    );
    (pipeline, source)
}

#[traced_test]
#[test]
fn emit_build_started_logs_build_id() {
    let _span = build_span("build-123").entered();
    emit_build_started("build-123", ARCHIVE_URL);

    assert!(logs_contain("build.started"));
    assert!(logs_contain("build-123"));
}

#[traced_test]
#[test]
fn emit_previous_degraded_logs_record_and_reason() {
    emit_previous_degraded("version", "connection reset");

    assert!(logs_contain("build.previous_degraded"));
    assert!(logs_contain("connection reset"));
}

#[traced_test]
#[tokio::test]
async fn successful_run_logs_lifecycle() {
    let (pipeline, _source) = pipeline(Arc::new(MemoryBlobStore::new()));

    let outcome = pipeline.run().await.unwrap();

    assert!(logs_contain("build.started"));
    assert!(logs_contain("build.sources_fetched"));
    assert!(logs_contain("build.version_derived"));
    assert!(logs_contain("build.artifact_packaged"));
    assert!(logs_contain("build.finished"));
    assert!(logs_contain(&outcome.result.version.to_string()));
    assert!(!logs_contain("build.failed"));
}

#[traced_test]
#[tokio::test]
async fn degraded_previous_state_is_logged() {
    let state = Arc::new(MemoryBlobStore::new());
    state.fail_get("version.json");
    let (pipeline, _source) = pipeline(state);

    pipeline.run().await.unwrap();

    assert!(logs_contain("build.previous_degraded"));
    assert!(logs_contain("record=\"version\"") || logs_contain("record=version"));
}

#[traced_test]
#[tokio::test]
async fn fatal_run_logs_failure() {
    let (pipeline, source) = pipeline(Arc::new(MemoryBlobStore::new()));
    source.fail(ARCHIVE_URL);

    assert!(pipeline.run().await.is_err());
    assert!(logs_contain("build.failed"));
    assert!(!logs_contain("build.finished"));
}
