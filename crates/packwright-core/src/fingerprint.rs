//! Content fingerprinting.
//!
//! Per-file digests form the build's [`Snapshot`]; the digest of the
//! canonical serialization of the whole source tree is the build digest that
//! feeds the version tag and the published version record.

use crate::archive::{write_archive, SourceTree};
use crate::domain::{FileDigest, FileRecord, Result, Snapshot};

/// Digest every file of the tree. Independent of archive entry order.
pub fn fingerprint(tree: &SourceTree) -> Snapshot {
    tree.files()
        .iter()
        .map(|(path, content)| FileRecord {
            path: path.clone(),
            digest: FileDigest::compute(content),
        })
        .collect()
}

/// Digest and size of the serialized source tree.
#[derive(Debug, Clone)]
pub struct BuildDigest {
    pub digest: FileDigest,
    /// Size of the canonical serialization in bytes
    pub size_bytes: u64,
}

/// Digest of the canonical (path-sorted) archive of the source files alone.
pub fn build_digest(tree: &SourceTree) -> Result<BuildDigest> {
    let bytes = write_archive(
        tree.files()
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_slice())),
    )?;
    Ok(BuildDigest {
        digest: FileDigest::compute(&bytes),
        size_bytes: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::normalize;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn source_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let options = SimpleFileOptions::default();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.add_directory("root/", options).unwrap();
        for (path, content) in files {
            writer.start_file(format!("root/{path}"), options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn fingerprint_digests_each_file() {
        let tree = normalize(&source_zip(&[("a.txt", b"1"), ("b.txt", b"2")])).unwrap();
        let snapshot = fingerprint(&tree);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("a.txt"), Some(&FileDigest::compute(b"1")));
        assert_eq!(snapshot.get("b.txt"), Some(&FileDigest::compute(b"2")));
    }

    #[test]
    fn fingerprint_independent_of_entry_order() {
        let forward = normalize(&source_zip(&[("a.txt", b"1"), ("b.txt", b"2")])).unwrap();
        let reverse = normalize(&source_zip(&[("b.txt", b"2"), ("a.txt", b"1")])).unwrap();
        assert_eq!(fingerprint(&forward), fingerprint(&reverse));
    }

    #[test]
    fn build_digest_independent_of_entry_order() {
        let forward = normalize(&source_zip(&[("a.txt", b"1"), ("b.txt", b"2")])).unwrap();
        let reverse = normalize(&source_zip(&[("b.txt", b"2"), ("a.txt", b"1")])).unwrap();
        assert_eq!(
            build_digest(&forward).unwrap().digest,
            build_digest(&reverse).unwrap().digest
        );
    }

    #[test]
    fn build_digest_changes_with_content() {
        let one = normalize(&source_zip(&[("a.txt", b"1")])).unwrap();
        let two = normalize(&source_zip(&[("a.txt", b"2")])).unwrap();
        assert_ne!(
            build_digest(&one).unwrap().digest,
            build_digest(&two).unwrap().digest
        );
    }
}
