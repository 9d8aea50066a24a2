//! Snapshot round-trip: dump, restore, and dump again must produce
//! byte-identical files and preserve the observable index state.

use std::fs;

use magnetar::index::DocumentIndexManager;
use tempfile::TempDir;

/// Deterministic pseudo-random stream, so the scenario is reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 16
    }
}

fn populated_index() -> DocumentIndexManager {
    let index = DocumentIndexManager::new(256, 1_000_000);
    let mut rng = Lcg(42);
    for _ in 0..1_000 {
        let doc_id = rng.next() % 10_000 + 1;
        let term_id = rng.next() % 500 + 1;
        let weight = (rng.next() % 1_000) as f32 / 1_000.0;
        let expire_time = (rng.next() % 100_000 + 1) as u32;
        index.update(doc_id, term_id, weight, expire_time);
    }
    index.apply(0);
    index
}

#[test]
fn dump_restore_dump_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("p").to_string_lossy().into_owned();
    let second = dir.path().join("p2").to_string_lossy().into_owned();

    let index = populated_index();
    index.dump(&first).unwrap();

    let restored = DocumentIndexManager::restore(256, 1_000_000, &first).unwrap();
    restored.dump(&second).unwrap();

    let first_bytes = fs::read(DocumentIndexManager::snapshot_path(&first)).unwrap();
    let second_bytes = fs::read(DocumentIndexManager::snapshot_path(&second)).unwrap();
    assert!(!first_bytes.is_empty());
    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn restore_preserves_observable_state() {
    let dir = TempDir::new().unwrap();
    let prefix = dir.path().join("state").to_string_lossy().into_owned();

    let index = populated_index();
    index.dump(&prefix).unwrap();
    let restored = DocumentIndexManager::restore(256, 1_000_000, &prefix).unwrap();

    assert_eq!(restored.size(), index.size());
    assert_eq!(restored.term_count(), index.term_count());
    assert_eq!(restored.expire_table_size(), index.expire_table_size());

    // Spot-check posting contents term by term.
    for term_id in 1..=500u64 {
        match (index.posting(term_id), restored.posting(term_id)) {
            (Some(original), Some(loaded)) => {
                assert_eq!(original.entries(), loaded.entries());
            }
            (None, None) => {}
            _ => panic!("posting presence differs for term {term_id}"),
        }
    }
}

#[test]
fn restore_survives_bucket_count_change() {
    let dir = TempDir::new().unwrap();
    let prefix = dir.path().join("rebucket").to_string_lossy().into_owned();

    let index = populated_index();
    index.dump(&prefix).unwrap();

    // The snapshot is independent of the bucket layout.
    let restored = DocumentIndexManager::restore(16, 1_000_000, &prefix).unwrap();
    assert_eq!(restored.size(), index.size());
}

#[test]
fn corrupt_snapshot_fails_restore() {
    let dir = TempDir::new().unwrap();
    let prefix = dir.path().join("corrupt").to_string_lossy().into_owned();

    let index = populated_index();
    index.dump(&prefix).unwrap();

    let path = DocumentIndexManager::snapshot_path(&prefix);
    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xff;
    fs::write(&path, &bytes).unwrap();

    assert!(DocumentIndexManager::restore(256, 1_000_000, &prefix).is_err());
}

#[test]
fn expiration_behaves_the_same_after_restore() {
    let dir = TempDir::new().unwrap();
    let prefix = dir.path().join("expire").to_string_lossy().into_owned();

    let index = DocumentIndexManager::new(64, 1000);
    index.update(10, 7, 0.5, 100);
    index.update(11, 7, 0.6, 200);
    index.apply(0);
    index.dump(&prefix).unwrap();

    let restored = DocumentIndexManager::restore(64, 1000, &prefix).unwrap();
    let (_, expired) = restored.apply(150);
    assert_eq!(expired, 1);

    let posting = restored.posting(7).unwrap();
    assert!(!posting.contains(10));
    assert!(posting.contains(11));
}
