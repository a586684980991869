//! Configuration for the solve pipeline

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading TOML configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration options for a solve
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolveConfig {
    /// Minimum extent of every solved box
    pub epsilon: f64,

    /// Give leaf polygons no constraint mentions a minimum size and a
    /// non-negative position
    pub default_sizing: bool,

    /// Minimum width and height applied by `default_sizing`
    pub default_min_size: f64,

    /// Diagonal offset between consecutive objects in the initial guess
    pub stagger: f64,

    /// Integer correction settings
    pub correction: CorrectionConfig,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            default_sizing: false,
            default_min_size: 10.0,
            stagger: 30.0,
            correction: CorrectionConfig::default(),
        }
    }
}

impl SolveConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load from a TOML string; missing keys keep their defaults
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Enable or disable default sizing of unconstrained leaves
    pub fn with_default_sizing(mut self, enabled: bool) -> Self {
        self.default_sizing = enabled;
        self
    }

    /// Set the minimum box extent
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the initial-guess stagger
    pub fn with_stagger(mut self, stagger: f64) -> Self {
        self.stagger = stagger;
        self
    }

    /// Set the integer correction settings
    pub fn with_correction(mut self, correction: CorrectionConfig) -> Self {
        self.correction = correction;
        self
    }
}

/// Settings for snapping the continuous solution to the integer grid
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Local search tries offsets in `-window..=window`
    pub window: i64,
    /// Number of most critical variables perturbed per round
    pub top_k: usize,
    /// Perturbation used to probe constraint sensitivity
    pub probe_delta: f64,
    /// Minimum change in a constraint's value for it to count as sensitive
    pub change_threshold: f64,
    /// Local search rounds before giving up
    pub max_rounds: usize,
    /// Slack allowed when checking a constraint
    pub tolerance: f64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            window: 3,
            top_k: 20,
            probe_delta: 1.0,
            change_threshold: 1e-6,
            max_rounds: 4,
            tolerance: 1e-6,
        }
    }
}
