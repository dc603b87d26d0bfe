//! Domain-level error taxonomy for packwright.
//!
//! `BuildError` covers the fatal class only: conditions under which the
//! pipeline cannot know what to build. Degraded inputs (missing previous
//! state) are modelled as `Prior` values, and publish or notification
//! failures are reported per target, so neither shows up here.

/// Errors produced when parsing a rendered version code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("version code must have four '-' separated parts, got: {0}")]
    Shape(String),

    #[error("version component {component} is not a non-negative integer: {value}")]
    Component { component: &'static str, value: String },

    #[error("version tag must not be empty")]
    EmptyTag,
}

/// Fatal pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("source {what} unavailable at {url}: {reason}")]
    SourceUnavailable {
        what: &'static str,
        url: String,
        reason: String,
    },

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("archive has no files under root directory {root}")]
    EmptyArchive { root: String },

    #[error("no version greater than {previous} can be derived")]
    VersionExhausted { previous: String },

    #[error("invalid pack metadata: {0}")]
    InvalidMetadata(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for packwright domain operations.
pub type Result<T> = std::result::Result<T, BuildError>;
