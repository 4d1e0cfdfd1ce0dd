use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cluster::ClusterParams;
use crate::error::PipelineError;
use crate::lexicon::MatchPolicy;
use crate::normalize::{DegeneratePolicy, DEFAULT_PRECISION};
use crate::topics::TopicParams;

pub const CONFIG_ENV: &str = "OPPORTUNITY_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub min_chars: usize,
    pub stopwords_path: Option<PathBuf>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_chars: 15,
            stopwords_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub match_policy: MatchPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    pub precision: u32,
    pub on_degenerate: DegeneratePolicy,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            on_degenerate: DegeneratePolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub min_clusters: usize,
    pub max_clusters: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        let p = ClusterParams::default();
        Self {
            min_clusters: p.min_clusters,
            max_clusters: p.max_clusters,
        }
    }
}

impl From<ClusteringConfig> for ClusterParams {
    fn from(c: ClusteringConfig) -> Self {
        ClusterParams {
            min_clusters: c.min_clusters,
            max_clusters: c.max_clusters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordsConfig {
    pub top_n: usize,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self { top_n: 20 }
    }
}

/// Run-wide settings. Every section is optional in the YAML file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub sentiment: SentimentConfig,
    pub scaling: ScalingConfig,
    pub clustering: ClusteringConfig,
    pub topics: TopicParams,
    pub keywords: KeywordsConfig,
}

impl PipelineConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let cfg: PipelineConfig = serde_yaml::from_str(s).context("decoding config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("loading config {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.clustering.min_clusters < 2 || self.clustering.min_clusters > self.clustering.max_clusters {
            return Err(PipelineError::InvalidConfig(format!(
                "cluster range {}..={} must start at 2 or more and be non-empty",
                self.clustering.min_clusters, self.clustering.max_clusters
            )));
        }
        if self.scaling.precision > 12 {
            return Err(PipelineError::InvalidConfig(format!(
                "precision {} exceeds 12 decimals",
                self.scaling.precision
            )));
        }
        if self.keywords.top_n == 0 {
            return Err(PipelineError::InvalidConfig("keywords.top_n must be positive".into()));
        }
        self.topics.validate()
    }
}

/// `--config` flag, else `$OPPORTUNITY_CONFIG`, else defaults.
pub fn resolve_config(cli_path: Option<&Path>) -> Result<PipelineConfig> {
    let path = match cli_path {
        Some(p) => Some(p.to_path_buf()),
        None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
    };
    match path {
        Some(p) => {
            debug!("Using config file: {}", p.display());
            PipelineConfig::load(&p)
        }
        None => {
            debug!("No config file given, using defaults");
            Ok(PipelineConfig::default())
        }
    }
}
