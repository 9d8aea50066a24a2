use std::collections::{BTreeSet, HashMap};

use crate::index::{DocId, ExpireTime, TermId};

/// One expiration record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpireEntry {
    pub term_id: TermId,
    pub doc_id: DocId,
    pub expire_time: ExpireTime,
}

/// Ordered expiration table: `(term, doc) -> expire_time` with pop-min.
///
/// A time-ordered set plus a key index, so re-updating a pair moves its
/// entry instead of duplicating it. The table contains an entry iff the
/// index holds the matching posting; the writer lane keeps both in step
/// under the changeset mutex.
#[derive(Debug, Default)]
pub struct ExpireTable {
    by_time: BTreeSet<(ExpireTime, TermId, DocId)>,
    by_key: HashMap<(TermId, DocId), ExpireTime>,
}

impl ExpireTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from snapshot records
    pub fn load(entries: impl IntoIterator<Item = ExpireEntry>) -> Self {
        let mut table = Self::new();
        for entry in entries {
            table.update((entry.term_id, entry.doc_id), entry.expire_time);
        }
        table
    }

    /// Upsert: replace the expire time in place when the pair exists
    pub fn update(&mut self, key: (TermId, DocId), expire_time: ExpireTime) {
        let (term_id, doc_id) = key;
        if let Some(previous) = self.by_key.insert(key, expire_time) {
            self.by_time.remove(&(previous, term_id, doc_id));
        }
        self.by_time.insert((expire_time, term_id, doc_id));
    }

    /// Pop entries with `expire_time <= now`, at most `max_batch`, in pop
    /// order. Popped entries are gone; the caller removes the postings.
    pub fn expire_with_limit(&mut self, now: ExpireTime, max_batch: usize) -> Vec<ExpireEntry> {
        let mut expired = Vec::new();
        while expired.len() < max_batch {
            let &(expire_time, term_id, doc_id) = match self.by_time.first() {
                Some(first) if first.0 <= now => first,
                _ => break,
            };
            self.by_time.remove(&(expire_time, term_id, doc_id));
            self.by_key.remove(&(term_id, doc_id));
            expired.push(ExpireEntry {
                term_id,
                doc_id,
                expire_time,
            });
        }
        expired
    }

    pub fn get(&self, key: (TermId, DocId)) -> Option<ExpireTime> {
        self.by_key.get(&key).copied()
    }

    pub fn size(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// All entries ascending by `(term, doc)`, the snapshot section order
    pub fn entries_sorted(&self) -> Vec<ExpireEntry> {
        let mut entries: Vec<ExpireEntry> = self
            .by_key
            .iter()
            .map(|(&(term_id, doc_id), &expire_time)| ExpireEntry {
                term_id,
                doc_id,
                expire_time,
            })
            .collect();
        entries.sort_by_key(|e| (e.term_id, e.doc_id));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_moves_existing_entry() {
        let mut table = ExpireTable::new();
        table.update((7, 1), 100);
        table.update((7, 1), 250);
        assert_eq!(table.size(), 1);
        assert_eq!(table.get((7, 1)), Some(250));

        // The old heap position is gone: nothing expires at 100.
        assert!(table.expire_with_limit(100, 10).is_empty());
        let expired = table.expire_with_limit(250, 10);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].expire_time, 250);
    }

    #[test]
    fn test_expire_with_limit_pops_in_time_order() {
        let mut table = ExpireTable::new();
        table.update((1, 10), 300);
        table.update((2, 20), 100);
        table.update((3, 30), 200);

        let expired = table.expire_with_limit(300, 10);
        let times: Vec<ExpireTime> = expired.iter().map(|e| e.expire_time).collect();
        assert_eq!(times, vec![100, 200, 300]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_expire_respects_batch_cap() {
        let mut table = ExpireTable::new();
        for doc in 1..=5 {
            table.update((1, doc), 50);
        }

        let first = table.expire_with_limit(100, 2);
        assert_eq!(first.len(), 2);
        assert_eq!(table.size(), 3);

        // Either nothing due remains, or the batch cap was the bound.
        let rest = table.expire_with_limit(100, 10);
        assert_eq!(rest.len(), 3);
        assert!(table.expire_with_limit(100, 10).is_empty());
    }

    #[test]
    fn test_expire_leaves_future_entries() {
        let mut table = ExpireTable::new();
        table.update((1, 10), 100);
        table.update((1, 20), 200);

        let expired = table.expire_with_limit(150, 10);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].doc_id, 10);
        assert_eq!(table.get((1, 20)), Some(200));
    }

    #[test]
    fn test_entries_sorted_by_key() {
        let mut table = ExpireTable::new();
        table.update((9, 2), 300);
        table.update((1, 5), 100);
        table.update((9, 1), 200);

        let entries = table.entries_sorted();
        let keys: Vec<(TermId, DocId)> = entries.iter().map(|e| (e.term_id, e.doc_id)).collect();
        assert_eq!(keys, vec![(1, 5), (9, 1), (9, 2)]);
    }
}
