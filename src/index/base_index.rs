use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::index::changeset::Changeset;
use crate::index::posting::PostingList;
use crate::index::{DocId, TermId, Weight};

/// Core term→posting-list store.
///
/// Terms live in a fixed set of buckets; the bucket count never changes
/// after construction, so a reader never observes a rehash. Posting lists
/// are immutable `Arc` values swapped under a short per-bucket write lock;
/// a reader clones the `Arc` under the read lock and the retired list
/// stays alive until its last reader drops it.
///
/// Mutations are staged in a [`Changeset`] and only become visible on
/// [`BaseIndex::apply_internal`]. The caller serializes the writer lane.
pub struct BaseIndex {
    buckets: Box<[RwLock<HashMap<TermId, Arc<PostingList>>>]>,
}

impl BaseIndex {
    pub fn new(initial_buckets: usize) -> Self {
        let count = initial_buckets.max(1);
        let buckets = (0..count)
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { buckets }
    }

    /// Rebuild applied state from snapshot postings
    pub fn load(
        initial_buckets: usize,
        postings: impl IntoIterator<Item = (TermId, Vec<(DocId, Weight)>)>,
    ) -> Self {
        let index = Self::new(initial_buckets);
        for (term_id, entries) in postings {
            if entries.is_empty() {
                continue;
            }
            let slot = index.bucket_of(term_id);
            index.buckets[slot]
                .write()
                .insert(term_id, Arc::new(PostingList::from_sorted(entries)));
        }
        index
    }

    fn bucket_of(&self, term_id: TermId) -> usize {
        // Fibonacci mix: integer-space part ids are often sequential.
        let mixed = term_id.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        (mixed % self.buckets.len() as u64) as usize
    }

    /// Reader-lane lookup: the current published list for a term
    pub fn posting(&self, term_id: TermId) -> Option<Arc<PostingList>> {
        self.buckets[self.bucket_of(term_id)]
            .read()
            .get(&term_id)
            .cloned()
    }

    /// Stage an upsert. Returns 1 when this `(term, doc)` pair is new
    /// within the changeset, 0 when it coalesces with a pending op.
    pub fn create_update_internal(
        &self,
        doc_id: DocId,
        term_id: TermId,
        weight: Weight,
        changeset: &mut Changeset,
    ) -> usize {
        usize::from(changeset.stage_upsert(term_id, doc_id, weight))
    }

    /// Stage a removal
    pub fn remove_internal(&self, doc_id: DocId, term_id: TermId, changeset: &mut Changeset) {
        changeset.stage_remove(term_id, doc_id);
    }

    /// Commit all staged ops. Each mutated term gets a freshly merged list
    /// published with one bucket write; the changeset is left empty.
    /// Returns the number of postings mutated.
    pub fn apply_internal(&self, changeset: &mut Changeset) -> usize {
        let mut mutated = 0;
        for (term_id, ops) in changeset.drain() {
            let slot = self.bucket_of(term_id);
            let old = self.buckets[slot]
                .read()
                .get(&term_id)
                .cloned()
                .unwrap_or_default();

            let (merged, count) = old.merged(ops);
            mutated += count;

            let mut bucket = self.buckets[slot].write();
            if merged.is_empty() {
                bucket.remove(&term_id);
            } else {
                bucket.insert(term_id, Arc::new(merged));
            }
        }
        mutated
    }

    /// Total number of postings across all terms
    pub fn size(&self) -> usize {
        self.buckets
            .iter()
            .map(|bucket| bucket.read().values().map(|list| list.len()).sum::<usize>())
            .sum()
    }

    /// Number of terms with a nonempty posting list
    pub fn term_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.read().len()).sum()
    }

    /// All published posting lists ascending by term id, for snapshots
    pub fn export_postings(&self) -> Vec<(TermId, Arc<PostingList>)> {
        let mut postings: Vec<(TermId, Arc<PostingList>)> = self
            .buckets
            .iter()
            .flat_map(|bucket| {
                bucket
                    .read()
                    .iter()
                    .map(|(&term_id, list)| (term_id, list.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        postings.sort_by_key(|&(term_id, _)| term_id);
        postings
    }
}
