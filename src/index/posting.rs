use crate::index::changeset::ChangeOp;
use crate::index::{DocId, Weight};

/// Posting list for one term: `(doc_id, weight)` pairs, ascending by
/// doc id, at most one entry per document.
///
/// Lists are immutable once published; mutation produces a new list via
/// [`PostingList::merged`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostingList {
    entries: Vec<(DocId, Weight)>,
}

impl PostingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries already ascending by doc id without duplicates
    pub fn from_sorted(entries: Vec<(DocId, Weight)>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        Self { entries }
    }

    pub fn get(&self, doc_id: DocId) -> Option<Weight> {
        self.entries
            .binary_search_by_key(&doc_id, |&(doc, _)| doc)
            .ok()
            .map(|i| self.entries[i].1)
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.get(doc_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(DocId, Weight)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &(DocId, Weight)> {
        self.entries.iter()
    }

    /// Linear merge with staged ops (also ascending by doc id).
    ///
    /// Upsert replaces an existing weight or inserts in sort order; Remove
    /// drops the entry if present. Returns the new list and the number of
    /// entries mutated.
    pub fn merged<I>(&self, ops: I) -> (PostingList, usize)
    where
        I: IntoIterator<Item = (DocId, ChangeOp)>,
    {
        let mut merged = Vec::with_capacity(self.entries.len());
        let mut mutated = 0;
        let mut old = self.entries.iter().copied().peekable();

        for (doc_id, op) in ops {
            // Carry over untouched entries below the staged doc id.
            while let Some(&(old_doc, old_weight)) = old.peek() {
                if old_doc >= doc_id {
                    break;
                }
                merged.push((old_doc, old_weight));
                old.next();
            }

            let existing = match old.peek() {
                Some(&(old_doc, _)) if old_doc == doc_id => {
                    old.next();
                    true
                }
                _ => false,
            };

            match op {
                ChangeOp::Upsert(weight) => {
                    merged.push((doc_id, weight));
                    mutated += 1;
                }
                ChangeOp::Remove => {
                    if existing {
                        mutated += 1;
                    }
                }
            }
        }

        merged.extend(old);
        (PostingList { entries: merged }, mutated)
    }
}
