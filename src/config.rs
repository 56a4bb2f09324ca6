//! Cortex configuration.
//!
//! Loaded from `<cortex>/.engram/config.yaml`, then overridden by
//! environment variables. Priority: env var > YAML > default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::activation::ActivationConfig;
use crate::error::EngramResult;
use crate::vectors::PersistenceStrategy;

/// Directory inside a cortex that holds indices and configuration.
pub const ENGRAM_DIR: &str = ".engram";
/// Configuration file name inside [`ENGRAM_DIR`].
pub const CONFIG_FILE: &str = "config.yaml";

pub const ENV_VECTOR_STRATEGY: &str = "ENGRAM_VECTOR_STRATEGY";
pub const ENV_DEFAULT_LIMIT: &str = "ENGRAM_DEFAULT_LIMIT";
pub const ENV_MAX_HOPS: &str = "ENGRAM_MAX_HOPS";

// ============================================================================
// Sections
// ============================================================================

/// Vector index section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorsConfig {
    pub strategy: PersistenceStrategy,
    /// Index file, relative to the cortex root unless absolute.
    pub path: PathBuf,
    /// Expected embedding width; checked after loading when set.
    pub dimension_hint: Option<usize>,
}

impl Default for VectorsConfig {
    fn default() -> Self {
        Self {
            strategy: PersistenceStrategy::Lazy,
            path: PathBuf::from(ENGRAM_DIR).join("vectors.bin"),
            dimension_hint: None,
        }
    }
}

/// Graph index section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub path: PathBuf,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(ENGRAM_DIR).join("graph.idx"),
        }
    }
}

/// Hybrid merge weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub text_weight: f64,
    pub vector_weight: f64,
    /// Feed the merged set into the activation engine.
    pub activate: bool,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            text_weight: 0.6,
            vector_weight: 0.4,
            activate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { default_limit: 10 }
    }
}

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngramConfig {
    pub vectors: VectorsConfig,
    pub graph: GraphConfig,
    pub activation: ActivationConfig,
    pub hybrid: HybridConfig,
    pub query: QueryConfig,
}

impl EngramConfig {
    /// Load `<cortex_root>/.engram/config.yaml` and apply env overrides.
    pub fn for_cortex(cortex_root: &Path) -> EngramResult<Self> {
        Self::from_yaml_and_env(&cortex_root.join(ENGRAM_DIR).join(CONFIG_FILE))
    }

    /// Load a YAML file (defaults when missing or unparsable), then apply
    /// env overrides and validate.
    pub fn from_yaml_and_env(yaml_path: &Path) -> EngramResult<Self> {
        let mut config = Self::load_yaml(yaml_path);
        config.apply_env();
        config.activation.validate()?;
        Ok(config)
    }

    fn load_yaml(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded cortex config");
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse cortex config, using defaults"
                    );
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!(path = %path.display(), "No cortex config, using defaults");
                Self::default()
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(raw) = std::env::var(ENV_VECTOR_STRATEGY) {
            match raw.parse() {
                Ok(strategy) => self.vectors.strategy = strategy,
                Err(e) => tracing::warn!(var = ENV_VECTOR_STRATEGY, error = %e, "Ignoring env override"),
            }
        }
        if let Some(limit) = parse_env::<usize>(ENV_DEFAULT_LIMIT) {
            self.query.default_limit = limit;
        }
        if let Some(hops) = parse_env::<usize>(ENV_MAX_HOPS) {
            self.activation.max_hops = hops;
        }
    }

    /// Absolute vector index path for a cortex.
    pub fn vectors_path(&self, cortex_root: &Path) -> PathBuf {
        cortex_root.join(&self.vectors.path)
    }

    /// Absolute graph index path for a cortex.
    pub fn graph_path(&self, cortex_root: &Path) -> PathBuf {
        cortex_root.join(&self.graph.path)
    }
}

fn parse_env<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var, value = %raw, "Ignoring unparsable env override");
            None
        }
    }
}
