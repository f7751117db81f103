//! Configuration for the organism brain.
//!
//! Supports YAML configuration files with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrainConfig {
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub actuators: ActuatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Online policy-gradient settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Step size for gradient ascent
    pub learning_rate: f64,
    /// Discount factor (gamma) for returns
    pub discount_factor: f64,
    /// Guard added to denominators in normalization and gradients
    pub epsilon: f64,
    /// Number of experiences in one training batch
    pub buffer_capacity: usize,
    /// Ticks between training attempts
    pub train_interval: u32,
}

/// Hidden layer sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Smallest hidden layer a brain may be born with
    pub hidden_min: usize,
    /// Largest hidden layer a brain may be born with
    pub hidden_max: usize,
}

/// Sensor normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Multiplier applied to brain-vs-center-of-mass offset before tanh
    pub position_scale: f64,
    /// Multiplier applied to brain-vs-body velocity before tanh
    pub velocity_scale: f64,
    /// Distance at which an eye reading saturates to 1.0
    pub eye_range: f64,
}

/// Actuator command scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Force applied by a swimmer at full exertion
    pub swim_force: f64,
    /// Jet magnitude at full exertion
    pub jet_force: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Steps between population stats lines in the demo
    pub stats_interval: u64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            discount_factor: 0.99,
            epsilon: 1e-8,
            buffer_capacity: 10,
            train_interval: 10,
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            hidden_min: 5,
            hidden_max: 30,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            position_scale: 0.05,
            velocity_scale: 0.5,
            eye_range: 150.0,
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            swim_force: 0.5,
            jet_force: 1.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval: 100,
        }
    }
}

impl TopologyConfig {
    /// True if `hidden` is a size this configuration accepts
    #[inline]
    pub fn accepts(&self, hidden: usize) -> bool {
        (self.hidden_min..=self.hidden_max).contains(&hidden)
    }
}

impl BrainConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: BrainConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let learning = &self.learning;
        if !(learning.learning_rate.is_finite() && learning.learning_rate > 0.0) {
            return Err("learning_rate must be a positive number".to_string());
        }
        if !(0.0..=1.0).contains(&learning.discount_factor) {
            return Err("discount_factor must be between 0 and 1".to_string());
        }
        if !(learning.epsilon > 0.0) {
            return Err("epsilon must be > 0".to_string());
        }
        if learning.buffer_capacity == 0 {
            return Err("buffer_capacity must be > 0".to_string());
        }
        if learning.train_interval == 0 {
            return Err("train_interval must be > 0".to_string());
        }
        if self.topology.hidden_min == 0 || self.topology.hidden_min > self.topology.hidden_max {
            return Err("hidden_min must be > 0 and not exceed hidden_max".to_string());
        }
        if self.logging.stats_interval == 0 {
            return Err("stats_interval must be > 0".to_string());
        }
        if !(self.sensors.eye_range > 0.0) {
            return Err("eye_range must be > 0".to_string());
        }
        Ok(())
    }
}
