//! Packwright Core Library
//!
//! The resource-pack build pipeline: normalize a source archive, fingerprint
//! it, diff against the previously published snapshot, derive the next
//! version, render the changelog, package the artifact, publish, notify.
//!
//! I/O goes through the `packwright_store` traits, so every stage can be
//! driven by in-memory fakes in tests.

pub mod archive;
pub mod changelog;
pub mod config;
pub mod diff;
pub mod domain;
pub mod fingerprint;
pub mod notify;
pub mod obs;
pub mod packager;
pub mod pipeline;
pub mod previous;
pub mod publish;
pub mod telemetry;

pub use archive::{normalize, read_archive, write_archive, SourceTree};
pub use changelog::ChangelogEntry;
pub use config::{ConfigError, NotifyConfig, PipelineConfig, StoreKeys};
pub use diff::{diff_snapshots, ChangeKind, ChangeSet};
pub use domain::{
    BuildError, Bump, FileDigest, FileRecord, InvalidDigest, Result, Snapshot, VersionCode,
    VersionParseError, VersionPolicy, VersionRecord,
};
pub use fingerprint::{build_digest, fingerprint, BuildDigest};
pub use notify::{
    compose_messages, BuildSummary, ChangeTotals, NotificationSink, Notifier, NotifyReport,
    WebhookSink,
};
pub use packager::{package, Artifact, GeneratedFiles, PackDescriptor, PackMetadata};
pub use pipeline::{BuildOutcome, BuildOutput, BuildPipeline, BuildResult};
pub use previous::{PreviousReport, PreviousState, Prior, PriorStatus};
pub use publish::{PublishBundle, PublishOutcome, PublishReport, PublishStatus, PublishTarget, Publisher};
