//! Configuration for assurance operations
//!
//! Defines the approval threshold, who may perform administrative actions and
//! the operational budgets of graph queries and reviewer notification.

use ratchet_domain::{ActorRef, Score};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Configuration for the assurance engine
///
/// # Examples
///
/// ```
/// use ratchet_assurance::AssuranceConfig;
///
/// // Default configuration (balanced)
/// let config = AssuranceConfig::default();
/// assert_eq!(config.approval_threshold, 7);
///
/// // Strict assurance
/// let config = AssuranceConfig::strict();
/// assert_eq!(config.approval_threshold, 8);
///
/// // Lenient assurance
/// let config = AssuranceConfig::lenient();
/// assert_eq!(config.approval_threshold, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssuranceConfig {
    /// Lowest peer/expert approval score that still promotes a claim
    /// Default: 7 (on a 0-10 scale)
    #[serde(default = "default_approval_threshold")]
    pub approval_threshold: u8,

    /// Actors allowed to reopen, tombstone and reconcile
    #[serde(default)]
    pub administrators: Vec<String>,

    /// Graph builds slower than this are logged as warnings
    /// Default: 2000 ms
    #[serde(default = "default_graph_latency_budget_ms")]
    pub graph_latency_budget_ms: u64,

    /// Reviewer notifications buffered before new ones are dropped
    /// Default: 256
    #[serde(default = "default_notification_queue_capacity")]
    pub notification_queue_capacity: usize,
}

fn default_approval_threshold() -> u8 {
    7
}

fn default_graph_latency_budget_ms() -> u64 {
    2000
}

fn default_notification_queue_capacity() -> usize {
    256
}

impl Default for AssuranceConfig {
    /// Balanced defaults: threshold 7, no administrators, 2 s graph budget
    fn default() -> Self {
        Self {
            approval_threshold: default_approval_threshold(),
            administrators: Vec::new(),
            graph_latency_budget_ms: default_graph_latency_budget_ms(),
            notification_queue_capacity: default_notification_queue_capacity(),
        }
    }
}

impl AssuranceConfig {
    /// Strict configuration for high-stakes reporting
    ///
    /// - Threshold: 8
    /// - Graph budget: 1 s
    pub fn strict() -> Self {
        Self {
            approval_threshold: 8,
            graph_latency_budget_ms: 1000,
            ..Self::default()
        }
    }

    /// Lenient configuration for pilots and development
    ///
    /// - Threshold: 5
    /// - Graph budget: 5 s
    pub fn lenient() -> Self {
        Self {
            approval_threshold: 5,
            graph_latency_budget_ms: 5000,
            ..Self::default()
        }
    }

    /// Add an administrator
    pub fn with_administrator(mut self, actor: impl Into<String>) -> Self {
        self.administrators.push(actor.into());
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AssuranceConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.approval_threshold > Score::MAX {
            return Err(ConfigError::InvalidValue(format!(
                "approval_threshold {} exceeds {}",
                self.approval_threshold,
                Score::MAX
            )));
        }
        if self.notification_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "notification_queue_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Threshold as a score, clamped to the scale
    pub fn threshold(&self) -> Score {
        Score::saturating(self.approval_threshold)
    }

    /// Graph latency budget as Duration
    pub fn graph_latency_budget(&self) -> Duration {
        Duration::from_millis(self.graph_latency_budget_ms)
    }

    /// Whether `actor` may perform administrative actions
    pub fn is_administrator(&self, actor: &ActorRef) -> bool {
        self.administrators.iter().any(|a| a == actor.as_str())
    }
}
