//! Feature model: namespaces, packed feature ids, and the interning cache

pub mod document;
pub mod feature_cache;
pub mod feature_space;

pub use document::{resolve_query_features, FeedDocument, QueryFeature};
pub use feature_cache::{Feature, FeatureCache};
pub use feature_space::{
    FeatureId, FeatureSpace, FeatureType, SpaceId, INVALID_FEATURE_ID, PART_ID_BITS, PART_ID_MASK,
};
