//! Artifact packaging.
//!
//! The published pack is the normalized source tree plus generated files at
//! reserved paths. Generated files always win over same-named source files;
//! every such override is reported on the [`Artifact`] and logged.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::archive::{write_archive, SourceTree};
use crate::domain::{BuildError, FileDigest, Result, VersionCode};

pub const PACK_MCMETA: &str = "pack.mcmeta";
pub const VERSION_TXT: &str = "version.txt";
pub const CHANGE_TXT: &str = "change.txt";
pub const PACK_PNG: &str = "pack.png";

const DEFAULT_DESCRIPTION: &str = "Resource Pack";
const DEFAULT_PACK_FORMAT: u64 = 1;

/// Pack metadata document served by the metadata source.
///
/// Unknown fields are preserved so the document can be republished as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_format: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_png_base64: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackMetadata {
    /// Parse the metadata document.
    ///
    /// # Errors
    ///
    /// `InvalidMetadata` if the body is not a JSON object of the expected shape.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| BuildError::InvalidMetadata(e.to_string()))
    }

    /// Description, defaulting when absent or empty.
    pub fn description(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
    }

    /// Pack format, defaulting when absent or zero.
    pub fn pack_format(&self) -> u64 {
        self.pack_format
            .filter(|f| *f != 0)
            .unwrap_or(DEFAULT_PACK_FORMAT)
    }

    /// Decode the optional base64 pack icon.
    ///
    /// # Errors
    ///
    /// `InvalidMetadata` if the field is present but not valid base64.
    pub fn decode_icon(&self) -> Result<Option<Vec<u8>>> {
        match self.pack_png_base64.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(encoded) => STANDARD
                .decode(encoded)
                .map(Some)
                .map_err(|e| BuildError::InvalidMetadata(format!("pack_png_base64: {e}"))),
        }
    }
}

/// `pack.mcmeta` contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackDescriptor {
    pub pack: PackSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackSection {
    pub description: String,
    pub pack_format: u64,
}

impl PackDescriptor {
    /// Descriptor with the version appended to the description on its own line.
    pub fn new(metadata: &PackMetadata, version: &VersionCode) -> Self {
        Self {
            pack: PackSection {
                description: format!("{}\n§9V.{}", metadata.description(), version),
                pack_format: metadata.pack_format(),
            },
        }
    }
}

/// Files injected into every artifact, in injection order.
#[derive(Debug, Clone)]
pub struct GeneratedFiles {
    files: Vec<(&'static str, Vec<u8>)>,
}

impl GeneratedFiles {
    /// Build the descriptor, version string, changelog history and optional icon.
    pub fn new(metadata: &PackMetadata, version: &VersionCode, changelog: &str) -> Result<Self> {
        let descriptor = serde_json::to_string_pretty(&PackDescriptor::new(metadata, version))?;
        let mut files = vec![
            (PACK_MCMETA, descriptor.into_bytes()),
            (VERSION_TXT, version.to_string().into_bytes()),
            (CHANGE_TXT, changelog.as_bytes().to_vec()),
        ];
        if let Some(icon) = metadata.decode_icon()? {
            files.push((PACK_PNG, icon));
        }
        Ok(Self { files })
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.files.iter().map(|(path, _)| *path)
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, content)| content.as_slice())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Serialized pack ready for publishing.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub digest: FileDigest,
    /// Number of entries in the archive
    pub entry_count: usize,
    /// Source paths replaced by generated files
    pub overridden: Vec<String>,
}

impl Artifact {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Merge generated files into the source tree and serialize, sorted by path.
pub fn package(tree: &SourceTree, generated: &GeneratedFiles) -> Result<Artifact> {
    let mut entries: BTreeMap<&str, &[u8]> = tree
        .files()
        .iter()
        .map(|(path, content)| (path.as_str(), content.as_slice()))
        .collect();

    let mut overridden = Vec::new();
    for (path, content) in &generated.files {
        if entries.insert(path, content.as_slice()).is_some() {
            warn!(path = %path, "Generated file overrides source file");
            overridden.push(path.to_string());
        }
    }

    let entry_count = entries.len();
    let bytes = write_archive(entries)?;
    Ok(Artifact {
        digest: FileDigest::compute(&bytes),
        bytes,
        entry_count,
        overridden,
    })
}
