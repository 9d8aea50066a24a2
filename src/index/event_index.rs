use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

use crate::error::Result;
use crate::index::base_index::BaseIndex;
use crate::index::changeset::Changeset;
use crate::index::expire_table::ExpireTable;
use crate::index::posting::PostingList;
use crate::index::snapshot::{self, SnapshotData};
use crate::index::{DocId, ExpireTime, TermId, Weight};

/// One per-term index event produced from a fed document
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EventTuple {
    pub doc_id: DocId,
    pub term_id: TermId,
    pub weight: Weight,
    pub expire_time: ExpireTime,
}

/// Writer-lane state: the staging changeset and the expiration table,
/// guarded by one mutex so both always move together.
#[derive(Default)]
struct WriterLane {
    changeset: Changeset,
    expire: ExpireTable,
}

/// A [`BaseIndex`] composed with an [`ExpireTable`].
///
/// All mutations funnel through the single writer mutex; reads go straight
/// to the posting store and observe the most recently applied commit.
pub struct BaseEventIndex {
    index: BaseIndex,
    /// Cap on postings expired per apply call
    max_size: usize,
    writer: Mutex<WriterLane>,
}

impl BaseEventIndex {
    pub fn new(initial_buckets: usize, max_size: usize) -> Self {
        Self {
            index: BaseIndex::new(initial_buckets),
            max_size,
            writer: Mutex::new(WriterLane::default()),
        }
    }

    /// Rebuild applied state from decoded snapshot data
    pub fn from_snapshot(initial_buckets: usize, max_size: usize, data: SnapshotData) -> Self {
        Self {
            index: BaseIndex::load(initial_buckets, data.postings),
            max_size,
            writer: Mutex::new(WriterLane {
                changeset: Changeset::new(),
                expire: ExpireTable::load(data.expires),
            }),
        }
    }

    /// Stage one posting upsert together with its expiration.
    /// Returns the number of newly staged pairs (0 or 1).
    pub fn update(
        &self,
        doc_id: DocId,
        term_id: TermId,
        weight: Weight,
        expire_time: ExpireTime,
    ) -> usize {
        let mut writer = self.writer.lock();
        writer.expire.update((term_id, doc_id), expire_time);
        self.index
            .create_update_internal(doc_id, term_id, weight, &mut writer.changeset)
    }

    /// Stage a whole batch under a single lock acquisition, so the batch
    /// becomes visible atomically on the next apply.
    pub fn batch_update(&self, batch: &[EventTuple]) -> usize {
        let mut staged = 0;
        let mut writer = self.writer.lock();
        for tuple in batch {
            writer
                .expire
                .update((tuple.term_id, tuple.doc_id), tuple.expire_time);
            staged += self.index.create_update_internal(
                tuple.doc_id,
                tuple.term_id,
                tuple.weight,
                &mut writer.changeset,
            );
        }
        staged
    }

    /// Expire up to `max_size` due entries, stage their removals, then
    /// commit the whole changeset. Returns `(applied, expired)`.
    pub fn apply(&self, now: ExpireTime) -> (usize, usize) {
        let mut writer = self.writer.lock();
        let expired = writer.expire.expire_with_limit(now, self.max_size);
        for entry in &expired {
            self.index
                .remove_internal(entry.doc_id, entry.term_id, &mut writer.changeset);
        }
        let applied = self.index.apply_internal(&mut writer.changeset);
        (applied, expired.len())
    }

    /// Serialize applied postings followed by the expire table.
    /// Returns the number of bytes written.
    pub fn dump<W: Write>(&self, writer: W) -> Result<u64> {
        // Hold the writer mutex so the expire section matches one commit.
        let lane = self.writer.lock();
        let postings = self.index.export_postings();
        let expires = lane.expire.entries_sorted();
        snapshot::write_snapshot(writer, &postings, &expires)
    }

    pub fn posting(&self, term_id: TermId) -> Option<Arc<PostingList>> {
        self.index.posting(term_id)
    }

    pub fn size(&self) -> usize {
        self.index.size()
    }

    pub fn term_count(&self) -> usize {
        self.index.term_count()
    }

    pub fn expire_table_size(&self) -> usize {
        self.writer.lock().expire.size()
    }

    pub fn changeset_is_empty(&self) -> bool {
        self.writer.lock().changeset.is_empty()
    }
}
