//! End-to-end scenarios for the feature cache and the event index:
//! space registration, feature interning, update/apply visibility,
//! TTL expiration, and batch atomicity.

use std::sync::Arc;

use magnetar::index::DocumentIndexManager;
use magnetar::model::{FeatureCache, FeatureSpace, FeatureType, INVALID_FEATURE_ID};

#[test]
fn space_creation_and_replacement() {
    let cache = FeatureCache::new();
    cache.create_space("A", 1, FeatureType::Integer);
    cache.create_space("BB", 2, FeatureType::String);

    assert_eq!(cache.get_space("A").unwrap().id(), 1);
    assert_eq!(cache.get_space("BB").unwrap().id(), 2);

    cache.create_space("A", 4, FeatureType::String);
    let replaced = cache.get_space("A").unwrap();
    assert_eq!(replaced.id(), 4);
    assert_eq!(replaced.feature_type(), FeatureType::String);
}

#[test]
fn feature_interning() {
    let cache = FeatureCache::new();
    cache.create_space("A", 1, FeatureType::Integer);
    cache.create_space("BB", 2, FeatureType::String);

    let numeric = cache.create_or_get_feature("111", "A").unwrap();
    assert_eq!(FeatureSpace::part_of(numeric.id()), 111);

    assert!(cache.create_or_get_feature("xxx", "A").is_none());

    let hashed = cache.create_or_get_feature("xxx", "BB").unwrap();
    assert_ne!(hashed.id(), INVALID_FEATURE_ID);

    let again = cache.create_or_get_feature("xxx", "BB").unwrap();
    assert!(Arc::ptr_eq(&hashed, &again));
}

#[test]
fn update_visible_only_after_apply() {
    let index = DocumentIndexManager::new(64, 1000);
    index.update(10, 7, 0.5, 100);

    // Staged but unapplied: readers see nothing.
    assert!(index.posting(7).is_none());

    let (applied, expired) = index.apply(0);
    assert_eq!((applied, expired), (1, 0));
    assert_eq!(index.posting(7).unwrap().get(10), Some(0.5));
}

#[test]
fn expiration_removes_only_due_postings() {
    let index = DocumentIndexManager::new(64, 1000);
    index.update(10, 7, 0.5, 100);
    index.update(11, 7, 0.6, 200);
    index.apply(0);

    let (applied, expired) = index.apply(150);
    assert!(expired >= 1);
    assert!(applied >= 1);

    let posting = index.posting(7).unwrap();
    assert!(!posting.contains(10));
    assert_eq!(posting.get(11), Some(0.6));
}

#[test]
fn batch_is_atomic_across_terms() {
    use magnetar::index::EventTuple;

    let index = DocumentIndexManager::new(64, 1000);
    index.batch_update(&[
        EventTuple {
            doc_id: 1,
            term_id: 100,
            weight: 0.4,
            expire_time: 500,
        },
        EventTuple {
            doc_id: 1,
            term_id: 200,
            weight: 0.8,
            expire_time: 500,
        },
    ]);

    // Neither posting is visible before the commit.
    assert!(index.posting(100).is_none());
    assert!(index.posting(200).is_none());

    index.apply(0);

    // Both land in the same commit.
    assert_eq!(index.posting(100).unwrap().get(1), Some(0.4));
    assert_eq!(index.posting(200).unwrap().get(1), Some(0.8));
}

#[test]
fn index_size_matches_posting_lengths() {
    let index = DocumentIndexManager::new(64, 1000);
    for doc in 1..=10u64 {
        index.update(doc, 100, 0.1, 1_000);
        index.update(doc, 200, 0.2, 1_000);
    }
    index.apply(0);

    assert_eq!(index.size(), 20);
    assert_eq!(index.term_count(), 2);
    assert_eq!(index.expire_table_size(), 20);

    let sum = index.posting(100).unwrap().len() + index.posting(200).unwrap().len();
    assert_eq!(index.size(), sum);
}

#[test]
fn posting_lists_stay_sorted_and_unique() {
    let index = DocumentIndexManager::new(64, 1000);
    for doc in [9u64, 3, 7, 3, 1, 9] {
        index.update(doc, 100, doc as f32, 1_000);
    }
    index.apply(0);

    let posting = index.posting(100).unwrap();
    let docs: Vec<u64> = posting.iter().map(|&(d, _)| d).collect();
    assert_eq!(docs, vec![1, 3, 7, 9]);
}

#[test]
fn expiration_is_capped_per_apply() {
    let index = DocumentIndexManager::new(64, 3);
    for doc in 1..=10u64 {
        index.update(doc, 100, 0.1, 50);
    }
    index.apply(0);
    assert_eq!(index.size(), 10);

    // Each tick removes at most max_size postings.
    let (_, expired) = index.apply(100);
    assert_eq!(expired, 3);
    assert_eq!(index.size(), 7);

    index.apply(100);
    index.apply(100);
    let (_, expired) = index.apply(100);
    assert_eq!(expired, 1);
    assert_eq!(index.size(), 0);
    assert_eq!(index.expire_table_size(), 0);
}
