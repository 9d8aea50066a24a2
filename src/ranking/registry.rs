use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MagnetarError, Result};
use crate::index::Weight;
use crate::model::FeatureCache;
use crate::ranking::feature_mapping::{FeatureMappingModel, MappingEdge};
use crate::ranking::{DirectModel, RankingModel};

/// Builds one model kind from its config node
pub type ModelBuilder = Box<dyn Fn(&serde_json::Value) -> Result<RankingModel> + Send + Sync>;

/// Registry of named ranking-model factories.
///
/// The `ranking` config node selects a factory by `name`; the rest of the
/// node is factory-specific.
#[derive(Default)]
pub struct ModelRegistry {
    builders: HashMap<String, ModelBuilder>,
}

/// Config shape for the feature-mapping model
#[derive(Debug, Deserialize)]
struct FeatureMappingSpec {
    mappings: Vec<MappingSpec>,
}

#[derive(Debug, Deserialize)]
struct MappingSpec {
    from: FeatureRef,
    to: Vec<WeightedFeatureRef>,
}

#[derive(Debug, Deserialize)]
struct FeatureRef {
    space: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct WeightedFeatureRef {
    space: String,
    key: String,
    #[serde(default = "default_edge_weight")]
    weight: Weight,
}

fn default_edge_weight() -> Weight {
    1.0
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in factories: `direct` and `feature_mapping`
    pub fn with_defaults(cache: Arc<FeatureCache>) -> Self {
        let mut registry = Self::new();
        registry.register("direct", Box::new(|_| Ok(RankingModel::Direct(DirectModel))));
        registry.register(
            "feature_mapping",
            Box::new(move |config| build_feature_mapping(config, &cache)),
        );
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, builder: ModelBuilder) {
        self.builders.insert(name.into(), builder);
    }

    /// Build the model selected by `config["name"]`
    pub fn create(&self, config: &serde_json::Value) -> Result<RankingModel> {
        let name = config
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| MagnetarError::Config("ranking model has no name".to_string()))?;
        let builder = self.builders.get(name).ok_or_else(|| {
            MagnetarError::Config(format!("unknown ranking model {name:?}"))
        })?;
        builder(config)
    }
}

fn build_feature_mapping(
    config: &serde_json::Value,
    cache: &FeatureCache,
) -> Result<RankingModel> {
    let spec: FeatureMappingSpec = serde_json::from_value(config.clone())
        .map_err(|e| MagnetarError::Config(format!("feature_mapping config: {e}")))?;

    let mut edges: HashMap<u64, Vec<MappingEdge>> = HashMap::new();
    for mapping in &spec.mappings {
        let source = cache
            .create_or_get_feature(&mapping.from.key, &mapping.from.space)
            .ok_or_else(|| {
                MagnetarError::Config(format!(
                    "feature_mapping: cannot resolve source {:?} in space {:?}",
                    mapping.from.key, mapping.from.space
                ))
            })?;
        let targets = edges.entry(source.id()).or_default();
        for target in &mapping.to {
            let resolved = cache
                .create_or_get_feature(&target.key, &target.space)
                .ok_or_else(|| {
                    MagnetarError::Config(format!(
                        "feature_mapping: cannot resolve target {:?} in space {:?}",
                        target.key, target.space
                    ))
                })?;
            targets.push(MappingEdge {
                target: resolved.id(),
                weight: target.weight,
            });
        }
    }

    Ok(RankingModel::FeatureMapping(FeatureMappingModel::new(
        edges,
    )))
}
