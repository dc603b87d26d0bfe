//! Property tests for the diff partition and version derivation.

use std::collections::BTreeMap;

use packwright_core::{diff_snapshots, FileDigest, Snapshot, VersionCode, VersionPolicy};
use proptest::prelude::*;

fn snapshot_strategy() -> impl Strategy<Value = BTreeMap<String, u8>> {
    prop::collection::btree_map("[a-e]{1,2}(/[a-e]{1,2})?", 0u8..4, 0..24)
}

fn to_snapshot(map: &BTreeMap<String, u8>) -> Snapshot {
    map.iter()
        .map(|(path, content)| (path.clone(), FileDigest::compute(&[*content])))
        .collect()
}

fn version_strategy() -> impl Strategy<Value = VersionCode> {
    (0u64..50, 0u64..50, 0u64..50)
        .prop_map(|(major, minor, patch)| VersionCode::new(major, minor, patch, "abcdef").unwrap())
}

proptest! {
    #[test]
    fn diff_of_identical_snapshots_is_empty(map in snapshot_strategy()) {
        let snapshot = to_snapshot(&map);
        prop_assert!(diff_snapshots(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn every_path_lands_in_exactly_one_class(a in snapshot_strategy(), b in snapshot_strategy()) {
        let (prev, cur) = (to_snapshot(&a), to_snapshot(&b));
        let changes = diff_snapshots(&prev, &cur);

        for path in a.keys().chain(b.keys()) {
            let unchanged = matches!(
                (prev.get(path), cur.get(path)),
                (Some(x), Some(y)) if x == y
            );
            let memberships = [
                changes.added.contains(path),
                changes.removed.contains(path),
                changes.modified.contains(path),
                unchanged,
            ];
            prop_assert_eq!(memberships.iter().filter(|m| **m).count(), 1, "path {}", path);
        }
        prop_assert_eq!(
            changes.magnitude(),
            changes.added.len() + changes.removed.len() + changes.modified.len()
        );
    }

    #[test]
    fn cold_start_adds_everything(map in snapshot_strategy()) {
        let changes = diff_snapshots(&Snapshot::new(), &to_snapshot(&map));
        prop_assert_eq!(changes.added.len(), map.len());
        prop_assert!(changes.removed.is_empty());
        prop_assert!(changes.modified.is_empty());
    }

    #[test]
    fn derive_is_strictly_monotonic(
        previous in version_strategy(),
        magnitude in 0usize..200,
        seed in any::<u64>(),
    ) {
        let digest = FileDigest::compute(&seed.to_le_bytes());
        let next = VersionPolicy::default().derive(&previous, magnitude, &digest).unwrap();

        prop_assert!(next > previous);
        prop_assert_eq!(next.tag(), &digest.to_hex()[..6]);
    }

    #[test]
    fn derive_advances_exactly_one_component(
        previous in version_strategy(),
        magnitude in 0usize..200,
    ) {
        let digest = FileDigest::compute(b"seed");
        let (ma, mi, pa) = previous.triple();
        let next = VersionPolicy::default().derive(&previous, magnitude, &digest).unwrap().triple();

        let allowed = [(ma, mi, pa + 1), (ma, mi + 1, 0), (ma + 1, 0, 0)];
        prop_assert!(allowed.contains(&next), "{:?} -> {:?}", previous.triple(), next);
    }

    #[test]
    fn derive_near_component_limits_never_goes_backwards(
        major in (u64::MAX - 2)..u64::MAX,
        minor in (u64::MAX - 2)..=u64::MAX,
        patch in (u64::MAX - 2)..=u64::MAX,
        magnitude in 0usize..40,
    ) {
        let previous = VersionCode::new(major, minor, patch, "abcdef").unwrap();
        let next = VersionPolicy::default()
            .derive(&previous, magnitude, &FileDigest::compute(b"seed"))
            .unwrap();
        prop_assert!(next > previous);
    }
}
