//! Configuration for the tree cache and the synthetic workload generator
use crate::cache::CacheError;
use serde::{Deserialize, Serialize};

/// Upper bound for `WorkloadConfig::mutation_ratio`
const MAX_MUTATION_RATIO: f64 = 10.0;

/// Capabilities composed into a `TreeCache` at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Maintain an id -> depth map incrementally
    pub depth_cache: bool,

    /// Move children of collapsed nodes out of the live child index
    pub eviction: bool,

    /// Expansion state given to nodes when they first become known
    pub expand_by_default: bool,

    /// Prefix for ids allocated by `Operation::Insert` (`{prefix}-{n}`)
    pub local_id_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            depth_cache: false,
            eviction: false,
            expand_by_default: true,
            local_id_prefix: "local".to_string(),
        }
    }
}

impl CacheConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.local_id_prefix.is_empty() {
            return Err(CacheError::invalid_config(
                "local_id_prefix cannot be empty",
            ));
        }

        if self.local_id_prefix.chars().any(char::is_whitespace) {
            return Err(CacheError::invalid_config(
                "local_id_prefix cannot contain whitespace",
            ));
        }

        Ok(())
    }

    /// The variant this configuration corresponds to
    pub fn variant(&self) -> CacheVariant {
        match (self.depth_cache, self.eviction) {
            (false, false) => CacheVariant::Plain,
            (true, false) => CacheVariant::DepthCache,
            (false, true) => CacheVariant::Eviction,
            (true, true) => CacheVariant::Both,
        }
    }
}

/// The four structural variants compared by the harness and the benches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheVariant {
    Plain,
    DepthCache,
    Eviction,
    Both,
}

impl CacheVariant {
    /// Every variant, in report order
    pub fn all() -> [CacheVariant; 4] {
        [
            CacheVariant::Plain,
            CacheVariant::DepthCache,
            CacheVariant::Eviction,
            CacheVariant::Both,
        ]
    }

    /// Short display name
    pub fn name(&self) -> &'static str {
        match self {
            CacheVariant::Plain => "plain",
            CacheVariant::DepthCache => "depth-cache",
            CacheVariant::Eviction => "eviction",
            CacheVariant::Both => "both",
        }
    }

    /// Default configuration with this variant's capabilities enabled
    pub fn config(&self) -> CacheConfig {
        let (depth_cache, eviction) = match self {
            CacheVariant::Plain => (false, false),
            CacheVariant::DepthCache => (true, false),
            CacheVariant::Eviction => (false, true),
            CacheVariant::Both => (true, true),
        };
        CacheConfig {
            depth_cache,
            eviction,
            ..CacheConfig::default()
        }
    }
}

impl std::fmt::Display for CacheVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for synthetic tree and mutation script generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadConfig {
    /// Seed shared by the fixture and the script builder
    pub seed: u64,

    /// Number of nodes in the generated tree
    pub target_nodes: usize,

    /// Children per page when the fixture is served in pages
    pub page_size: usize,

    /// Mutations generated per fixture node
    pub mutation_ratio: f64,

    /// Relative weight of wide/shallow subtrees
    pub wide_weight: f64,

    /// Relative weight of balanced subtrees
    pub balanced_weight: f64,

    /// Relative weight of deep/narrow chains
    pub deep_weight: f64,

    /// Length of deep chains
    pub max_depth: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            target_nodes: 10_000,
            page_size: 50,
            mutation_ratio: 0.1,
            wide_weight: 0.4,
            balanced_weight: 0.4,
            deep_weight: 0.2,
            max_depth: 80,
        }
    }
}

impl WorkloadConfig {
    /// Default workload with a different seed and size
    pub fn with_seed(seed: u64, target_nodes: usize) -> Self {
        Self {
            seed,
            target_nodes,
            ..Self::default()
        }
    }

    /// Number of operations the script builder should emit
    pub fn mutation_count(&self) -> usize {
        ((self.target_nodes as f64 * self.mutation_ratio) as usize).max(1)
    }

    /// Sum of the shape weights
    pub fn total_weight(&self) -> f64 {
        self.wide_weight + self.balanced_weight + self.deep_weight
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.target_nodes == 0 {
            return Err("target_nodes must be greater than 0".to_string());
        }

        if self.page_size == 0 {
            return Err("page_size must be greater than 0".to_string());
        }

        if self.max_depth == 0 {
            return Err("max_depth must be greater than 0".to_string());
        }

        if !(self.mutation_ratio > 0.0 && self.mutation_ratio <= MAX_MUTATION_RATIO) {
            return Err(format!(
                "mutation_ratio must be in (0, {}]",
                MAX_MUTATION_RATIO
            ));
        }

        let weights = [self.wide_weight, self.balanced_weight, self.deep_weight];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err("shape weights must be finite and non-negative".to_string());
        }

        if self.total_weight() <= 0.0 {
            return Err("at least one shape weight must be positive".to_string());
        }

        Ok(())
    }
}
