use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::FeatureSpaceConfig;
use crate::model::feature_space::{
    FeatureId, FeatureSpace, FeatureType, SpaceId, INVALID_FEATURE_ID,
};

/// An interned feature: a key together with its packed id.
///
/// Immutable after creation; documents and queries share the same handle.
#[derive(Debug)]
pub struct Feature {
    key: String,
    id: FeatureId,
}

impl Feature {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }
}

/// Registry of feature spaces plus the feature interning table.
///
/// Spaces are registered at startup and rarely after; lookups dominate.
/// Re-registering a name replaces the space handle, but features interned
/// through the old space stay resolvable by id.
#[derive(Default)]
pub struct FeatureCache {
    spaces: RwLock<HashMap<String, Arc<FeatureSpace>>>,
    features: DashMap<FeatureId, Arc<Feature>>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache with all spaces from the configuration registered.
    /// A duplicated name keeps the last declaration, same as re-registration.
    pub fn from_config(spaces: &[FeatureSpaceConfig]) -> Self {
        let cache = Self::new();
        for space in spaces {
            cache.create_space(&space.name, space.id, space.feature_type);
        }
        cache
    }

    /// Insert or replace the space registered under `name`
    pub fn create_space(
        &self,
        name: &str,
        id: SpaceId,
        feature_type: FeatureType,
    ) -> Arc<FeatureSpace> {
        let space = Arc::new(FeatureSpace::new(name, id, feature_type));
        self.spaces.write().insert(name.to_string(), space.clone());
        space
    }

    pub fn get_space(&self, name: &str) -> Option<Arc<FeatureSpace>> {
        self.spaces.read().get(name).cloned()
    }

    /// Resolve a space by its numeric id (linear over the registry; the
    /// registry holds tens of spaces, not thousands)
    pub fn get_space_by_id(&self, id: SpaceId) -> Option<Arc<FeatureSpace>> {
        self.spaces
            .read()
            .values()
            .find(|space| space.id() == id)
            .cloned()
    }

    /// Resolve the space by name, then intern the feature.
    /// Returns `None` when the space is unknown or the key is invalid.
    pub fn create_or_get_feature(&self, key: &str, space_name: &str) -> Option<Arc<Feature>> {
        let space = self.get_space(space_name)?;
        self.create_or_get_feature_in(key, &space)
    }

    /// Intern a feature within a resolved space.
    /// Returns `None` iff the id computation fails (Integer parse error).
    pub fn create_or_get_feature_in(
        &self,
        key: &str,
        space: &FeatureSpace,
    ) -> Option<Arc<Feature>> {
        let id = space.calculate_feature_id(key);
        if id == INVALID_FEATURE_ID {
            return None;
        }
        let feature = self
            .features
            .entry(id)
            .or_insert_with(|| {
                Arc::new(Feature {
                    key: key.to_string(),
                    id,
                })
            })
            .clone();
        Some(feature)
    }

    pub fn get_feature(&self, id: FeatureId) -> Option<Arc<Feature>> {
        self.features.get(&id).map(|entry| entry.clone())
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn space_count(&self) -> usize {
        self.spaces.read().len()
    }
}
