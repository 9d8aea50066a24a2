pub mod api;
pub mod config;
pub mod error;
pub mod index;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod ranking;

pub use api::{create_router, AppState};
pub use config::{Config, FeatureSpaceConfig, IndexConfig, ServerConfig};
pub use error::{MagnetarError, Result};
pub use index::{BaseEventIndex, BaseIndex, DocumentIndexManager, EventTuple, ExpireTable};
pub use metrics::IndexMetrics;
pub use model::{Feature, FeatureCache, FeatureSpace, FeatureType, FeedDocument, QueryFeature};
pub use pipeline::DocumentUpdatePipeline;
pub use query::{QueryExecutor, SearchHit};
pub use ranking::{ModelRegistry, RankingModel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
