use std::collections::{HashMap, HashSet};

use crate::index::{TermId, Weight};
use crate::model::{FeatureSpace, QueryFeature, SpaceId};

/// One mapping target with its edge weight
#[derive(Clone, Copy, Debug)]
pub struct MappingEdge {
    pub target: TermId,
    pub weight: Weight,
}

/// Rewrites query features through a many-to-many feature mapping.
///
/// Features whose space participates as a mapping source are replaced by
/// their targets, the query weight scaled by each edge weight; a source
/// feature without edges contributes nothing. Features from other spaces
/// pass through untouched, so mixed queries fall back to direct scoring
/// on those terms.
pub struct FeatureMappingModel {
    edges: HashMap<TermId, Vec<MappingEdge>>,
    source_spaces: HashSet<SpaceId>,
}

impl FeatureMappingModel {
    pub fn new(edges: HashMap<TermId, Vec<MappingEdge>>) -> Self {
        let source_spaces = edges
            .keys()
            .map(|&term_id| FeatureSpace::space_of(term_id))
            .collect();
        Self {
            edges,
            source_spaces,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|targets| targets.len()).sum()
    }

    pub fn source_spaces(&self) -> &HashSet<SpaceId> {
        &self.source_spaces
    }

    /// Apply the mapping to a feature list; output may contain duplicate
    /// targets, the caller aggregates.
    pub(crate) fn rewrite<'a>(
        &'a self,
        features: &'a [QueryFeature],
    ) -> impl Iterator<Item = QueryFeature> + 'a {
        features.iter().flat_map(move |feature| {
            let space = FeatureSpace::space_of(feature.term_id);
            if !self.source_spaces.contains(&space) {
                return vec![*feature];
            }
            match self.edges.get(&feature.term_id) {
                Some(targets) => targets
                    .iter()
                    .map(|edge| QueryFeature::new(edge.target, feature.weight * edge.weight))
                    .collect(),
                None => Vec::new(),
            }
        })
    }
}
