//! Configuration for Trellis.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. A TOML file (`~/.config/trellis/config.toml`, or an explicit path)
//! 3. Environment variables `TRELLIS_<SECTION>__<KEY>`, e.g.
//!    `TRELLIS_QUERY__BETA=0.8`

use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "TRELLIS";

/// Config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Embedding providers understood by the CLI.
pub const EMBEDDING_PROVIDERS: &[&str] = &["hashing", "openai"];

/// Extraction providers understood by the CLI.
pub const EXTRACTION_PROVIDERS: &[&str] = &["heuristic", "chat"];

/// Boost aggregation policies.
pub const AGGREGATIONS: &[&str] = &["max_weight", "sum_at_min_hop"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Config file not found: {0:?}")]
    MissingFile(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub extraction: ExtractionConfig,
    pub query: QueryConfig,
    pub graph: GraphConfig,
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Snapshot directory (`~` is expanded)
    pub data_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "hashing" (offline) or "openai" (any OpenAI-compatible endpoint)
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    pub dimensions: usize,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Falls back to `OPENAI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// "heuristic" (offline) or "chat"
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub alpha: f32,
    pub beta: f32,
    pub k_anchors: usize,
    pub max_hops: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    pub max_hops_ceiling: usize,
    pub symmetric: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub decay_exponent: f32,
    /// "max_weight" or "sum_at_min_hop"
    pub aggregation: String,
}

/// Default snapshot directory.
pub fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|d| d.join("trellis").to_string_lossy().into_owned())
        .unwrap_or_else(|| "~/.trellis".to_string())
}

/// Default config file location (`~/.config/trellis/config.toml` on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("trellis").join(CONFIG_FILE_NAME))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: default_data_dir(),
            },
            embedding: EmbeddingConfig {
                provider: "hashing".to_string(),
                model: None,
                dimensions: 256,
                base_url: None,
                api_key: None,
            },
            extraction: ExtractionConfig {
                provider: "heuristic".to_string(),
                model: None,
                base_url: None,
                api_key: None,
            },
            query: QueryConfig {
                alpha: 1.0,
                beta: 0.5,
                k_anchors: 10,
                max_hops: 2,
                limit: 20,
            },
            graph: GraphConfig {
                max_hops_ceiling: 2,
                symmetric: false,
            },
            scoring: ScoringConfig {
                decay_exponent: 1.0,
                aggregation: "max_weight".to_string(),
            },
        }
    }
}

impl Config {
    /// Load from defaults, the config file and the environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::MissingFile(p.to_path_buf())),
            Some(p) => Some((p.to_path_buf(), true)),
            None => default_config_path().map(|p| (p, false)),
        };
        Self::load_from(file.as_ref().map(|(p, required)| (p.as_path(), *required)))
    }

    fn load_from(file: Option<(&Path, bool)>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("storage.data_dir", defaults.storage.data_dir)?
            .set_default("embedding.provider", defaults.embedding.provider)?
            .set_default("embedding.dimensions", defaults.embedding.dimensions as u64)?
            .set_default("extraction.provider", defaults.extraction.provider)?
            .set_default("query.alpha", defaults.query.alpha as f64)?
            .set_default("query.beta", defaults.query.beta as f64)?
            .set_default("query.k_anchors", defaults.query.k_anchors as u64)?
            .set_default("query.max_hops", defaults.query.max_hops as u64)?
            .set_default("query.limit", defaults.query.limit as u64)?
            .set_default("graph.max_hops_ceiling", defaults.graph.max_hops_ceiling as u64)?
            .set_default("graph.symmetric", defaults.graph.symmetric)?
            .set_default("scoring.decay_exponent", defaults.scoring.decay_exponent as f64)?
            .set_default("scoring.aggregation", defaults.scoring.aggregation)?;

        if let Some((path, required)) = file {
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(required),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: Config = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the engine would refuse later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.query;
        if !q.alpha.is_finite() || !q.beta.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "query.alpha and query.beta must be finite (got {} and {})",
                q.alpha, q.beta
            )));
        }
        if q.k_anchors == 0 {
            return Err(ConfigError::Invalid("query.k_anchors must be >= 1".into()));
        }
        if q.limit == 0 {
            return Err(ConfigError::Invalid("query.limit must be >= 1".into()));
        }
        if q.max_hops > self.graph.max_hops_ceiling {
            return Err(ConfigError::Invalid(format!(
                "query.max_hops ({}) exceeds graph.max_hops_ceiling ({})",
                q.max_hops, self.graph.max_hops_ceiling
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::Invalid("embedding.dimensions must be >= 1".into()));
        }
        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown embedding.provider '{}' (expected one of {:?})",
                self.embedding.provider, EMBEDDING_PROVIDERS
            )));
        }
        if !EXTRACTION_PROVIDERS.contains(&self.extraction.provider.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown extraction.provider '{}' (expected one of {:?})",
                self.extraction.provider, EXTRACTION_PROVIDERS
            )));
        }
        if self.extraction.provider == "chat"
            && (self.extraction.base_url.is_none() || self.extraction.model.is_none())
        {
            return Err(ConfigError::Invalid(
                "extraction.provider = \"chat\" requires extraction.base_url and extraction.model"
                    .into(),
            ));
        }
        let s = &self.scoring;
        if !s.decay_exponent.is_finite() || s.decay_exponent < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "scoring.decay_exponent must be finite and >= 0 (got {})",
                s.decay_exponent
            )));
        }
        if !AGGREGATIONS.contains(&s.aggregation.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown scoring.aggregation '{}' (expected one of {:?})",
                s.aggregation, AGGREGATIONS
            )));
        }
        Ok(())
    }

    /// Snapshot directory with `~` and environment variables expanded.
    pub fn data_dir(&self) -> PathBuf {
        match shellexpand::full(&self.storage.data_dir) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(shellexpand::tilde(&self.storage.data_dir).as_ref()),
        }
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Write this config as a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        std::fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write config file: {:?}", path))
    }
}

impl EmbeddingConfig {
    /// Configured key, or `OPENAI_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}
