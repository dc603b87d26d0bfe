//! Build notifications.
//!
//! A [`BuildSummary`] is rendered into a framed message sequence:
//!
//! 1. start barrier
//! 2. "build initialized" with previous and new version
//! 3. per-path messages for added, removed, modified, `chunk_size` paths each
//! 4. totals summary
//! 5. end barrier
//!
//! Delivery is best-effort. Sink failures are logged and never surface to
//! the build result.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::NotifyConfig;
use crate::diff::{ChangeKind, ChangeSet};
use crate::domain::VersionCode;
use crate::obs;

/// Blank message that visually separates builds in the channel.
pub const BARRIER: &str = "** **";

/// Embed accent colour.
const EMBED_COLOR: u32 = 0x00bfff;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTotals {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub total: usize,
}

/// Summary handed to the notifier at the end of a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    pub previous_version: VersionCode,
    pub new_version: VersionCode,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub totals: ChangeTotals,
}

impl BuildSummary {
    pub fn new(previous_version: VersionCode, new_version: VersionCode, changes: &ChangeSet) -> Self {
        Self {
            previous_version,
            new_version,
            added: changes.added.iter().cloned().collect(),
            removed: changes.removed.iter().cloned().collect(),
            modified: changes.modified.iter().cloned().collect(),
            totals: ChangeTotals {
                added: changes.added.len(),
                removed: changes.removed.len(),
                modified: changes.modified.len(),
                total: changes.magnitude(),
            },
        }
    }

    fn paths(&self, kind: ChangeKind) -> &[String] {
        match kind {
            ChangeKind::Added => &self.added,
            ChangeKind::Removed => &self.removed,
            ChangeKind::Modified => &self.modified,
        }
    }
}

/// Render the full message sequence for `summary`.
///
/// `chunk_size` is clamped to at least one path per message.
pub fn compose_messages(summary: &BuildSummary, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut messages = vec![
        BARRIER.to_string(),
        format!(
            "**Resource Pack Build Initialized**\nPrevious version: `{}`\nNew version: `{}`",
            summary.previous_version, summary.new_version
        ),
    ];

    for kind in ChangeKind::ALL {
        for chunk in summary.paths(kind).chunks(chunk_size) {
            let body: Vec<String> = chunk
                .iter()
                .map(|path| format!("**Type:** {}\n**Path:** `{}`", kind.as_str(), path))
                .collect();
            messages.push(body.join("\n\n"));
        }
    }

    messages.push(
        [
            "**Build Complete!**".to_string(),
            format!("**New Version:** `{}`", summary.new_version),
            format!("Added: {}", summary.totals.added),
            format!("Removed: {}", summary.totals.removed),
            format!("Modified: {}", summary.totals.modified),
            format!("Total Changes: {}", summary.totals.total),
        ]
        .join("\n"),
    );
    messages.push(BARRIER.to_string());
    messages
}

/// Destination for notification messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: &str) -> anyhow::Result<()>;
}

/// Posts each message as a single embed to a chat webhook.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build webhook client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn payload(message: &str) -> serde_json::Value {
        json!({
            "embeds": [{
                "description": message,
                "color": EMBED_COLOR,
                "timestamp": Utc::now().to_rfc3339(),
            }]
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, message: &str) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(&Self::payload(message))
            .send()
            .await
            .context("webhook request failed")?
            .error_for_status()
            .context("webhook rejected message")?;
        Ok(())
    }
}

/// Delivery counts for one notification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends a build summary through a sink, pacing messages.
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    chunk_size: usize,
    delay: Duration,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, chunk_size: usize, delay: Duration) -> Self {
        Self {
            sink,
            chunk_size,
            delay,
        }
    }

    /// Webhook notifier from config, or `None` when no webhook is configured.
    pub fn from_config(config: &NotifyConfig, timeout: Duration) -> anyhow::Result<Option<Self>> {
        let Some(url) = config.webhook_url.as_deref() else {
            return Ok(None);
        };
        let sink = WebhookSink::new(url, timeout)?;
        Ok(Some(Self::new(
            Arc::new(sink),
            config.chunk_size,
            config.rate_limit_delay(),
        )))
    }

    /// Deliver every message in order. Failures are logged and skipped.
    pub async fn notify(&self, summary: &BuildSummary) -> NotifyReport {
        let mut report = NotifyReport::default();
        for message in compose_messages(summary, self.chunk_size) {
            match self.sink.send(&message).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    obs::emit_notify_failed(&format!("{e:#}"));
                    report.failed += 1;
                }
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<String>>,
        fail_every: Option<usize>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, message: &str) -> anyhow::Result<()> {
            let mut messages = self.messages.lock().unwrap();
            messages.push(message.to_string());
            if let Some(n) = self.fail_every {
                if messages.len() % n == 0 {
                    anyhow::bail!("sink down");
                }
            }
            Ok(())
        }
    }

    fn summary(added: usize, modified: usize) -> BuildSummary {
        let changes = ChangeSet {
            added: (0..added).map(|i| format!("a/{i:03}")).collect(),
            removed: BTreeSet::new(),
            modified: (0..modified).map(|i| format!("m/{i:03}")).collect(),
        };
        BuildSummary::new(
            VersionCode::baseline(),
            "0-1-0-abcdef".parse().unwrap(),
            &changes,
        )
    }

    #[test]
    fn messages_are_framed_and_chunked() {
        let messages = compose_messages(&summary(16, 1), 15);

        // barrier, init, 2 added chunks, 1 modified chunk, totals, barrier
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[0], BARRIER);
        assert!(messages[1].contains("Previous version: `0-0-0-init`"));
        assert!(messages[1].contains("New version: `0-1-0-abcdef`"));
        assert_eq!(messages[2].matches("**Type:** added").count(), 15);
        assert_eq!(messages[3].matches("**Type:** added").count(), 1);
        assert!(messages[4].contains("**Type:** modified\n**Path:** `m/000`"));
        assert!(messages[5].contains("Total Changes: 17"));
        assert_eq!(messages[6], BARRIER);
    }

    #[test]
    fn empty_change_set_still_frames() {
        let messages = compose_messages(&summary(0, 0), 15);
        assert_eq!(messages.len(), 4);
        assert!(messages[2].contains("Total Changes: 0"));
    }

    #[test]
    fn summary_totals_match_changes() {
        let s = summary(3, 2);
        assert_eq!(
            s.totals,
            ChangeTotals {
                added: 3,
                removed: 0,
                modified: 2,
                total: 5
            }
        );
    }

    #[test]
    fn webhook_payload_is_embed() {
        let payload = WebhookSink::payload("hello");
        assert_eq!(payload["embeds"][0]["description"], "hello");
        assert_eq!(payload["embeds"][0]["color"], 0x00bfff);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_counted_not_propagated() {
        let sink = Arc::new(RecordingSink {
            fail_every: Some(2),
            ..RecordingSink::default()
        });
        let notifier = Notifier::new(sink.clone(), 15, Duration::from_millis(500));

        let report = notifier.notify(&summary(1, 0)).await;

        assert_eq!(report.sent + report.failed, 5);
        assert_eq!(report.failed, 2);
        assert_eq!(sink.messages.lock().unwrap().len(), 5);
    }

    #[test]
    fn from_config_without_webhook_is_none() {
        let notifier = Notifier::from_config(&NotifyConfig::default(), Duration::from_secs(1)).unwrap();
        assert!(notifier.is_none());
    }
}
