//! Query executor: expands query features through the ranking model,
//! walks posting lists, and collects the top-K scored documents.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use crate::index::{DocId, DocumentIndexManager, TermId, Weight};
use crate::model::QueryFeature;
use crate::ranking::RankingModel;

/// One scored result
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f32,
}

/// Executes ranked queries against the posting store
pub struct QueryExecutor {
    index: Arc<DocumentIndexManager>,
    model: Arc<RankingModel>,
}

impl QueryExecutor {
    pub fn new(index: Arc<DocumentIndexManager>, model: Arc<RankingModel>) -> Self {
        Self { index, model }
    }

    /// Run a query and return up to `top_k` hits, descending by score
    pub fn execute(&self, features: &[QueryFeature], top_k: usize) -> Vec<SearchHit> {
        self.execute_filtered(features, top_k, None)
    }

    /// Like [`QueryExecutor::execute`], with an optional doc-id exclusion
    pub fn execute_filtered(
        &self,
        features: &[QueryFeature],
        top_k: usize,
        exclude: Option<&HashSet<DocId>>,
    ) -> Vec<SearchHit> {
        if top_k == 0 || features.is_empty() {
            return Vec::new();
        }

        let expanded = self.model.expand(features);
        if expanded.is_empty() {
            return Vec::new();
        }

        // Pin one posting snapshot per term; terms absent from the index
        // are skipped. Each snapshot stays readable for the whole walk
        // even if an apply retires it meanwhile.
        let mut candidates: HashMap<DocId, HashMap<TermId, Weight>> = HashMap::new();
        for feature in &expanded {
            let Some(posting) = self.index.posting(feature.term_id) else {
                continue;
            };
            for &(doc_id, weight) in posting.iter() {
                if exclude.is_some_and(|set| set.contains(&doc_id)) {
                    continue;
                }
                candidates
                    .entry(doc_id)
                    .or_default()
                    .insert(feature.term_id, weight);
            }
        }

        // Bounded min-heap: the worst kept score stays on top.
        let mut heap: BinaryHeap<Reverse<(Score, Reverse<DocId>)>> =
            BinaryHeap::with_capacity(top_k + 1);
        for (doc_id, doc_terms) in &candidates {
            let score = self
                .model
                .score(&expanded, |term_id| doc_terms.get(&term_id).copied());
            let entry = Reverse((Score(score), Reverse(*doc_id)));
            if heap.len() < top_k {
                heap.push(entry);
            } else if let Some(worst) = heap.peek() {
                if entry < *worst {
                    heap.pop();
                    heap.push(entry);
                }
            }
        }

        let mut hits: Vec<SearchHit> = heap
            .into_iter()
            .map(|Reverse((Score(score), Reverse(doc_id)))| SearchHit { doc_id, score })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.doc_id.cmp(&b.doc_id))
        });
        hits
    }
}

/// Wrapper for f32 that implements Ord for use in BinaryHeap
#[derive(Clone, Copy, Debug, PartialEq)]
struct Score(f32);

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}
