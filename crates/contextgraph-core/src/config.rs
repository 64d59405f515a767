use crate::{ContextGraphError, Result};
use config as cfg;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GraphConfig {
    /// Hard cap applied to every requested traversal depth.
    #[serde(default = "GraphConfig::default_max_traversal_depth")]
    pub max_traversal_depth: usize,
}

impl GraphConfig {
    fn default_max_traversal_depth() -> usize {
        5
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_traversal_depth: Self::default_max_traversal_depth(),
        }
    }
}

/// Component weights for the HYBRID ranking strategy.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RankingWeights {
    pub path_length: f64,
    pub edge_weight: f64,
    pub node_centrality: f64,
    pub semantic: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            path_length: 0.3,
            edge_weight: 0.3,
            node_centrality: 0.2,
            semantic: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RetrievalConfig {
    /// Traversal depth used when the request carries no traversal spec.
    #[serde(default = "RetrievalConfig::default_default_depth")]
    pub default_depth: usize,
    /// Result size below which the orchestrator flags the result as thin.
    #[serde(default = "RetrievalConfig::default_min_results_threshold")]
    pub min_results_threshold: usize,
    /// Edit-distance tolerance for the fuzzy property matcher; applied only
    /// to strings longer than 3 characters.
    #[serde(default = "RetrievalConfig::default_levenshtein_max_distance")]
    pub levenshtein_max_distance: usize,
    /// In-flight request bound enforced by the orchestrator.
    #[serde(default = "RetrievalConfig::default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub ranking: RankingWeights,
}

impl RetrievalConfig {
    fn default_default_depth() -> usize {
        2
    }

    fn default_min_results_threshold() -> usize {
        5
    }

    fn default_levenshtein_max_distance() -> usize {
        2
    }

    fn default_max_concurrent_requests() -> usize {
        32
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_depth: Self::default_default_depth(),
            min_results_threshold: Self::default_min_results_threshold(),
            levenshtein_max_distance: Self::default_levenshtein_max_distance(),
            max_concurrent_requests: Self::default_max_concurrent_requests(),
            ranking: RankingWeights::default(),
        }
    }
}

/// Read-only runtime settings. Loaded once at construction; never mutated
/// on the request path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Settings {
    /// Layered load: optional `contextgraph.toml` in the working directory,
    /// then `CONTEXTGRAPH_*` environment overrides (e.g.
    /// `CONTEXTGRAPH_RETRIEVAL__DEFAULT_DEPTH=3`).
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    pub fn load_from(path: Option<&str>) -> Result<Self> {
        let mut builder = cfg::Config::builder();
        match path {
            Some(p) => builder = builder.add_source(cfg::File::with_name(p)),
            None => {
                builder = builder.add_source(cfg::File::with_name("contextgraph").required(false))
            }
        }
        let settings = builder
            .add_source(cfg::Environment::with_prefix("CONTEXTGRAPH").separator("__"))
            .build()
            .map_err(|e| ContextGraphError::Configuration(e.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|e| ContextGraphError::Configuration(e.to_string()))
    }
}
