//! Packwright - resource pack build pipeline CLI
//!
//! ## Commands
//!
//! - `build`: fetch, version, package and publish the pack
//! - `fingerprint`: print the snapshot of a local source archive
//! - `diff`: compare two snapshot files and preview the next version

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use packwright_core::{
    build_digest, changelog, diff_snapshots, fingerprint, normalize, BuildPipeline, ChangeSet,
    FileDigest, Notifier, PipelineConfig, Snapshot, VersionCode,
};
use packwright_store::{BlobStore, FsBlobStore, HttpBlobStore, HttpSource};
use serde::Serialize;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "packwright")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Versioned resource pack builder", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one build and print the result
    Build {
        /// TOML config file; PACKWRIGHT_* env vars override it
        #[arg(short, long, env = "PACKWRIGHT_CONFIG")]
        config: Option<PathBuf>,

        /// Keep state and artifacts in a local directory instead of the blob API
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Notification webhook URL (overrides config)
        #[arg(long)]
        webhook: Option<String>,

        /// Print the full outcome (changes, publish report, previous state)
        #[arg(long)]
        full: bool,

        /// Exit non-zero if any publish target failed
        #[arg(long)]
        strict: bool,
    },

    /// Print the snapshot (path -> SHA-1) of a local source archive
    Fingerprint {
        /// Source zip with a single top-level directory
        archive: PathBuf,
    },

    /// Diff two snapshot files and preview the next version and changelog
    Diff {
        /// Previous snapshot JSON
        previous: PathBuf,
        /// Current snapshot JSON
        current: PathBuf,
        /// Version the previous snapshot was published as
        #[arg(long, default_value = "0-0-0-init")]
        previous_version: VersionCode,
        /// Print only the rendered changelog block
        #[arg(long)]
        changelog: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    packwright_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Build {
            config,
            store_dir,
            webhook,
            full,
            strict,
        } => cmd_build(config.as_deref(), store_dir.as_deref(), webhook, full, strict).await,
        Commands::Fingerprint { archive } => cmd_fingerprint(&archive),
        Commands::Diff {
            previous,
            current,
            previous_version,
            changelog,
        } => cmd_diff(&previous, &current, &previous_version, changelog),
    }
}

async fn cmd_build(
    config_path: Option<&Path>,
    store_dir: Option<&Path>,
    webhook: Option<String>,
    full: bool,
    strict: bool,
) -> Result<()> {
    let mut config = PipelineConfig::load(config_path).context("Failed to load configuration")?;
    if webhook.is_some() {
        config.notify.webhook_url = webhook;
    }

    let source = HttpSource::new(config.fetch_timeout_secs).context("Failed to build HTTP client")?;
    let store: Arc<dyn BlobStore> = match store_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Using local store");
            Arc::new(FsBlobStore::new(dir).context("Failed to open local store")?)
        }
        None => Arc::new(HttpBlobStore::from_env().context("Failed to configure blob store")?),
    };
    let notifier = Notifier::from_config(&config.notify, config.fetch_timeout())?;

    let mut pipeline = BuildPipeline::new(config, Arc::new(source), store.clone(), store);
    if let Some(notifier) = notifier {
        pipeline = pipeline.with_notifier(notifier);
    }

    let outcome = pipeline.run().await.context("Build failed")?;

    if full {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&outcome.output())?);
    }

    let failed: Vec<&str> = outcome
        .publish
        .failures()
        .map(|o| o.target.as_str())
        .collect();
    if !failed.is_empty() {
        warn!(targets = ?failed, "Some publish targets failed");
        if strict {
            anyhow::bail!("publish failed for: {}", failed.join(", "));
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintOutput {
    root: String,
    file_count: usize,
    build_digest: FileDigest,
    files: Snapshot,
}

fn cmd_fingerprint(archive: &Path) -> Result<()> {
    let bytes = std::fs::read(archive)
        .with_context(|| format!("Failed to read archive: {:?}", archive))?;
    let tree = normalize(&bytes).context("Failed to normalize archive")?;
    let output = FingerprintOutput {
        root: tree.root().to_string(),
        file_count: tree.len(),
        build_digest: build_digest(&tree)?.digest,
        files: fingerprint(&tree),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffOutput {
    previous_version: VersionCode,
    version: VersionCode,
    magnitude: usize,
    changes: ChangeSet,
    changelog: String,
}

fn preview(previous: &Snapshot, current: &Snapshot, previous_version: &VersionCode) -> Result<DiffOutput> {
    let changes = diff_snapshots(previous, current);
    // Without the source tree the snapshot itself stands in for the build digest.
    let digest = FileDigest::compute(current.to_json_pretty()?.as_bytes());
    let version = packwright_core::VersionPolicy::default()
        .derive(previous_version, changes.magnitude(), &digest)
        .with_context(|| format!("No version after {previous_version}"))?;
    Ok(DiffOutput {
        previous_version: previous_version.clone(),
        magnitude: changes.magnitude(),
        changelog: changelog::render(&version, &changes),
        version,
        changes,
    })
}

fn cmd_diff(
    previous: &Path,
    current: &Path,
    previous_version: &VersionCode,
    changelog_only: bool,
) -> Result<()> {
    let previous: Snapshot = read_json_file(previous)?;
    let current: Snapshot = read_json_file(current)?;
    let output = preview(&previous, &current, previous_version)?;

    if changelog_only {
        println!("{}", output.changelog);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn snapshot(entries: &[(&str, &str)]) -> Snapshot {
        entries
            .iter()
            .map(|(p, c)| (p.to_string(), FileDigest::compute(c.as_bytes())))
            .collect()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn diff_parses_previous_version() {
        let cli = Cli::try_parse_from([
            "packwright",
            "diff",
            "a.json",
            "b.json",
            "--previous-version",
            "1-2-3-abcdef",
        ])
        .unwrap();
        match cli.command {
            Commands::Diff {
                previous_version, ..
            } => assert_eq!(previous_version.triple(), (1, 2, 3)),
            _ => panic!("expected diff command"),
        }
    }

    #[test]
    fn diff_rejects_malformed_version() {
        assert!(Cli::try_parse_from([
            "packwright",
            "diff",
            "a.json",
            "b.json",
            "--previous-version",
            "1.2.3",
        ])
        .is_err());
    }

    #[test]
    fn preview_derives_next_version() {
        let previous = snapshot(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let current = snapshot(&[("a", "1"), ("b", "9"), ("d", "4")]);
        let output = preview(&previous, &current, &"0-4-2-abcdef".parse().unwrap()).unwrap();

        assert_eq!(output.magnitude, 3);
        assert_eq!(output.version.triple(), (0, 4, 3));
        assert!(output.changelog.contains("Added:\n- d"));
        assert!(output.changelog.contains("Removed:\n- c"));
        assert!(output.changelog.contains("Modified:\n- b"));
    }

    #[test]
    fn diff_reads_snapshot_files() {
        let dir = tempfile::tempdir().unwrap();
        let prev = dir.path().join("prev.json");
        let cur = dir.path().join("cur.json");
        std::fs::write(&prev, "{}").unwrap();
        std::fs::write(&cur, snapshot(&[("a", "1")]).to_json_pretty().unwrap()).unwrap();

        assert!(cmd_diff(&prev, &cur, &VersionCode::baseline(), true).is_ok());
        assert!(cmd_diff(&prev, &dir.path().join("missing.json"), &VersionCode::baseline(), false).is_err());
    }
}
