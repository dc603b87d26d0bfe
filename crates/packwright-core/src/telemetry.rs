//! Log output for the `packwright` binary.
//!
//! Build lifecycle events from [`crate::obs`] and per-target publish warnings
//! are the main traffic. They go to stderr so the JSON build result printed
//! on stdout stays machine-readable. `--json` switches the log lines to
//! newline-delimited JSON for CI log collectors.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events follow the requested verbosity.
const PACKWRIGHT_TARGETS: [&str; 3] = ["packwright", "packwright_core", "packwright_store"];

/// Filter directive used when `RUST_LOG` is unset.
///
/// Packwright crates log at `level`; dependencies such as the HTTP client
/// stay at `warn` so `-v` does not flood the output with connection chatter.
pub fn default_filter(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        PACKWRIGHT_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.as_str().to_lowercase())),
    );
    directives.join(",")
}

/// Install the global subscriber. `RUST_LOG` overrides [`default_filter`].
///
/// Later calls are ignored; the global subscriber is set once per process.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(stderr_layer.json()).try_init().ok();
    } else {
        registry.with(stderr_layer).try_init().ok();
    }
}
