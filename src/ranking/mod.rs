//! Ranking model layer: rewrites query features and scores candidates

pub mod feature_mapping;
pub mod registry;

pub use feature_mapping::FeatureMappingModel;
pub use registry::ModelRegistry;

use std::collections::{BTreeMap, HashSet};

use crate::index::{TermId, Weight};
use crate::model::{FeatureSpace, QueryFeature, SpaceId};

/// Scores documents directly: the dot product of query weights and
/// document term weights over the terms present in both.
#[derive(Debug, Default)]
pub struct DirectModel;

/// Polymorphic ranking model
pub enum RankingModel {
    Direct(DirectModel),
    FeatureMapping(FeatureMappingModel),
}

impl RankingModel {
    /// Rewrite query features into the term space scored against postings.
    ///
    /// Duplicate targets are aggregated by summing weights; the result is
    /// ascending by term id.
    pub fn expand(&self, features: &[QueryFeature]) -> Vec<QueryFeature> {
        match self {
            RankingModel::Direct(_) => aggregate(features.iter().copied()),
            RankingModel::FeatureMapping(model) => aggregate(model.rewrite(features)),
        }
    }

    /// Spaces whose posting lists a query over `features` will walk
    pub fn required_spaces(&self, features: &[QueryFeature]) -> HashSet<SpaceId> {
        self.expand(features)
            .iter()
            .map(|f| FeatureSpace::space_of(f.term_id))
            .collect()
    }

    /// Score one candidate: expanded query weights against the document's
    /// term weights, resolved through `doc_weight`.
    pub fn score<F>(&self, expanded: &[QueryFeature], doc_weight: F) -> f32
    where
        F: Fn(TermId) -> Option<Weight>,
    {
        expanded
            .iter()
            .filter_map(|f| doc_weight(f.term_id).map(|w| f.weight * w))
            .sum()
    }
}

/// Sum weights per term and order ascending by term id
fn aggregate(features: impl Iterator<Item = QueryFeature>) -> Vec<QueryFeature> {
    let mut by_term: BTreeMap<TermId, Weight> = BTreeMap::new();
    for feature in features {
        *by_term.entry(feature.term_id).or_insert(0.0) += feature.weight;
    }
    by_term
        .into_iter()
        .map(|(term_id, weight)| QueryFeature::new(term_id, weight))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(space: SpaceId, part: u64, weight: Weight) -> QueryFeature {
        QueryFeature::new(((space as u64) << 48) | part, weight)
    }

    #[test]
    fn test_direct_expand_aggregates_duplicates() {
        let model = RankingModel::Direct(DirectModel);
        let expanded = model.expand(&[
            feature(1, 7, 0.5),
            feature(1, 3, 1.0),
            feature(1, 7, 0.25),
        ]);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].term_id, feature(1, 3, 0.0).term_id);
        assert_eq!(expanded[1].weight, 0.75);
    }

    #[test]
    fn test_direct_score_sums_matching_terms() {
        let model = RankingModel::Direct(DirectModel);
        let query = model.expand(&[feature(1, 7, 0.5), feature(1, 3, 2.0)]);

        let score = model.score(&query, |term| {
            (term == feature(1, 7, 0.0).term_id).then_some(0.4)
        });
        assert!((score - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_required_spaces() {
        let model = RankingModel::Direct(DirectModel);
        let spaces = model.required_spaces(&[feature(1, 7, 0.5), feature(2, 3, 1.0)]);
        assert_eq!(spaces, HashSet::from([1, 2]));
    }
}
