use std::collections::HashMap;

use crate::error::{MagnetarError, Result};
use crate::index::{DocId, ExpireTime, TermId, Weight, INVALID_DOC_ID};
use crate::model::FeatureCache;

/// A document resolved for indexing: a bag of weighted terms plus the
/// absolute time its postings expire.
#[derive(Clone, Debug)]
pub struct FeedDocument {
    pub doc_id: DocId,
    pub terms: Vec<(TermId, Weight)>,
    pub expire_time: ExpireTime,
}

impl FeedDocument {
    /// Resolve raw `space -> key -> weight` maps against the feature cache.
    ///
    /// `ttl` falls back to the configured default when absent. Unknown
    /// spaces and keys that fail id computation are per-request errors.
    pub fn resolve(
        doc_id: DocId,
        features: &HashMap<String, HashMap<String, Weight>>,
        ttl: Option<u32>,
        default_ttl: u32,
        now: ExpireTime,
        cache: &FeatureCache,
    ) -> Result<Self> {
        if doc_id == INVALID_DOC_ID {
            return Err(MagnetarError::Parse("doc_id 0 is reserved".to_string()));
        }

        let mut terms = Vec::new();
        for (space_name, keys) in features {
            let space = cache.get_space(space_name).ok_or_else(|| {
                MagnetarError::Parse(format!("unknown feature space {space_name:?}"))
            })?;
            for (key, weight) in keys {
                let feature = cache.create_or_get_feature_in(key, &space).ok_or_else(|| {
                    MagnetarError::Parse(format!(
                        "invalid key {key:?} for feature space {space_name:?}"
                    ))
                })?;
                terms.push((feature.id(), *weight));
            }
        }

        Ok(Self {
            doc_id,
            terms,
            expire_time: now.saturating_add(ttl.unwrap_or(default_ttl)),
        })
    }
}

/// One weighted query feature after resolution
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryFeature {
    pub term_id: TermId,
    pub weight: Weight,
}

impl QueryFeature {
    pub fn new(term_id: TermId, weight: Weight) -> Self {
        Self { term_id, weight }
    }
}

/// Resolve query-side `space -> key -> weight` maps into weighted features
pub fn resolve_query_features(
    features: &HashMap<String, HashMap<String, Weight>>,
    cache: &FeatureCache,
) -> Result<Vec<QueryFeature>> {
    let mut resolved = Vec::new();
    for (space_name, keys) in features {
        let space = cache
            .get_space(space_name)
            .ok_or_else(|| MagnetarError::Parse(format!("unknown feature space {space_name:?}")))?;
        for (key, weight) in keys {
            let feature = cache.create_or_get_feature_in(key, &space).ok_or_else(|| {
                MagnetarError::Parse(format!(
                    "invalid key {key:?} for feature space {space_name:?}"
                ))
            })?;
            resolved.push(QueryFeature::new(feature.id(), *weight));
        }
    }
    Ok(resolved)
}
