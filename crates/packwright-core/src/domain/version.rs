//! Version codes and the change-magnitude bump policy.
//!
//! A version code renders as `{major}-{minor}-{patch}-{tag}`, where the tag is
//! the first six hex characters of the build digest (or `init` for the
//! cold-start baseline). Ordering and equality consider only the numeric
//! triple; the tag is display-only.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::digest::FileDigest;
use super::error::VersionParseError;

/// Tag carried by the cold-start baseline.
pub const BASELINE_TAG: &str = "init";

/// Number of digest hex characters used as the build tag.
pub const TAG_LEN: usize = 6;

/// Three-component monotonic version plus a display-only build tag.
#[derive(Debug, Clone)]
pub struct VersionCode {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    tag: String,
}

impl VersionCode {
    /// Build a version code. Fails on an empty tag.
    pub fn new(
        major: u64,
        minor: u64,
        patch: u64,
        tag: impl Into<String>,
    ) -> std::result::Result<Self, VersionParseError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(VersionParseError::EmptyTag);
        }
        Ok(Self {
            major,
            minor,
            patch,
            tag,
        })
    }

    /// The cold-start baseline `0-0-0-init`.
    pub fn baseline() -> Self {
        Self {
            major: 0,
            minor: 0,
            patch: 0,
            tag: BASELINE_TAG.to_string(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The ordering key.
    pub fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    pub fn is_baseline(&self) -> bool {
        self.triple() == (0, 0, 0) && self.tag == BASELINE_TAG
    }

    /// Apply a bump and attach the tag derived from `build_digest`.
    ///
    /// Exactly one component advances and lower components reset to zero. A
    /// component already at `u64::MAX` carries into the next one up; `None`
    /// once the major component is exhausted too.
    pub fn bumped(&self, bump: Bump, build_digest: &FileDigest) -> Option<Self> {
        let major = || self.major.checked_add(1).map(|major| (major, 0, 0));
        let minor = || {
            self.minor
                .checked_add(1)
                .map(|minor| (self.major, minor, 0))
                .or_else(major)
        };
        let (major, minor, patch) = match bump {
            Bump::Patch => self
                .patch
                .checked_add(1)
                .map(|patch| (self.major, self.minor, patch))
                .or_else(minor)?,
            Bump::Minor => minor()?,
            Bump::Major => major()?,
        };
        Some(Self {
            major,
            minor,
            patch,
            tag: build_digest.short(TAG_LEN),
        })
    }
}

impl PartialEq for VersionCode {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Eq for VersionCode {}

impl PartialOrd for VersionCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl fmt::Display for VersionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.major, self.minor, self.patch, self.tag)
    }
}

impl FromStr for VersionCode {
    type Err = VersionParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().splitn(4, '-').collect();
        let [major, minor, patch, tag] = parts.as_slice() else {
            return Err(VersionParseError::Shape(s.to_string()));
        };
        let component = |name: &'static str, value: &str| {
            value
                .parse::<u64>()
                .map_err(|_| VersionParseError::Component {
                    component: name,
                    value: value.to_string(),
                })
        };
        Self::new(
            component("major", major)?,
            component("minor", minor)?,
            component("patch", patch)?,
            *tag,
        )
    }
}

impl Serialize for VersionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which component a build advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bump {
    Patch,
    Minor,
    Major,
}

/// Thresholds mapping change magnitude to a bump.
///
/// - `magnitude < patch_threshold` → patch
/// - `patch_threshold <= magnitude <= minor_threshold` → minor
/// - `magnitude > minor_threshold` → major
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionPolicy {
    pub patch_threshold: usize,
    pub minor_threshold: usize,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self {
            patch_threshold: 15,
            minor_threshold: 25,
        }
    }
}

impl VersionPolicy {
    /// Classify a change magnitude.
    pub fn bump_for(&self, magnitude: usize) -> Bump {
        if magnitude < self.patch_threshold {
            Bump::Patch
        } else if magnitude <= self.minor_threshold {
            Bump::Minor
        } else {
            Bump::Major
        }
    }

    /// Derive the next version from `previous`, the total number of changed
    /// paths and the build digest. `None` if no greater version exists.
    pub fn derive(
        &self,
        previous: &VersionCode,
        magnitude: usize,
        build_digest: &FileDigest,
    ) -> Option<VersionCode> {
        previous.bumped(self.bump_for(magnitude), build_digest)
    }
}

/// Published version record.
///
/// `timestamp` and `digest` are optional on read so that hand-seeded or
/// older records holding only a `version` still resolve; the pipeline always
/// writes them. `digest` also accepts the older `sha1` field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub version: VersionCode,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_count: usize,
    #[serde(default, alias = "sha1")]
    pub digest: Option<FileDigest>,
}

impl VersionRecord {
    pub fn new(version: VersionCode, file_count: usize, digest: FileDigest) -> Self {
        Self {
            version,
            timestamp: Some(Utc::now()),
            file_count,
            digest: Some(digest),
        }
    }
}
