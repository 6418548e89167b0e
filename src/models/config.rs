//! Configuration models for limno.
//!
//! Everything the user can tune lives here and is resolved once, at
//! startup, from a TOML file. The model constants and the experiment
//! shape are held in one immutable `Config`; nothing reads ambient
//! global state after that.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for limno.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Lake model constants
    #[serde(default)]
    pub model: ModelConfig,

    /// Experiment shape (scenario/policy counts, seed)
    #[serde(default)]
    pub experiment: ExperimentConfig,

    /// Evaluator configuration
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            experiment: ExperimentConfig::default(),
            evaluator: EvaluatorConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Lake model constants.
///
/// These are the fixed inputs of every evaluation; uncertainties and
/// levers are sampled per scenario/policy instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Utility weight on releases (default 0.41)
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Replication count for Monte Carlo averaging of the stochastic
    /// inflow (default 150)
    #[serde(default = "default_nsamples")]
    pub nsamples: usize,

    /// Planning horizon in time steps (default 100)
    #[serde(default = "default_horizon")]
    pub horizon: usize,
}

fn default_alpha() -> f64 {
    0.41
}

fn default_nsamples() -> usize {
    150
}

fn default_horizon() -> usize {
    100
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            nsamples: default_nsamples(),
            horizon: default_horizon(),
        }
    }
}

/// Experiment shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Number of scenarios to sample from the uncertainty space
    #[serde(default = "default_scenarios")]
    pub scenarios: usize,

    /// Number of candidate policies to sample from the lever space
    #[serde(default = "default_policies")]
    pub policies: usize,

    /// Base seed; the whole design and every replication derive from it
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_scenarios() -> usize {
    1000
}

fn default_policies() -> usize {
    4
}

fn default_seed() -> u64 {
    42
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            scenarios: default_scenarios(),
            policies: default_policies(),
            seed: default_seed(),
        }
    }
}

/// Evaluator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Worker threads for the parallel evaluator (0 = one per core)
    #[serde(default)]
    pub workers: usize,

    /// Force sequential evaluation (overrides `workers`)
    #[serde(default)]
    pub sequential: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            sequential: false,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Results file path (JSONL, one row per scenario-policy pair)
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// Whether to record per-case evaluation time in each row
    #[serde(default = "default_true")]
    pub track_timing: bool,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output/results.jsonl")
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            track_timing: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check that all configured values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.model.alpha > 0.0 && self.model.alpha.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "model.alpha",
                reason: "must be a positive finite number".to_string(),
            });
        }
        if self.model.nsamples == 0 {
            return Err(ConfigError::InvalidValue {
                field: "model.nsamples",
                reason: "at least one replication is required".to_string(),
            });
        }
        // Inertia divides by horizon - 1
        if self.model.horizon < 2 {
            return Err(ConfigError::InvalidValue {
                field: "model.horizon",
                reason: "horizon must be at least 2 steps".to_string(),
            });
        }
        if self.experiment.scenarios == 0 {
            return Err(ConfigError::InvalidValue {
                field: "experiment.scenarios",
                reason: "at least one scenario is required".to_string(),
            });
        }
        if self.experiment.policies == 0 {
            return Err(ConfigError::InvalidValue {
                field: "experiment.policies",
                reason: "at least one policy is required".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}
