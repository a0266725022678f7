//! Configuration System for the greenhouse controller
//!
//! Provides a flexible configuration system supporting:
//! - TOML configuration files
//! - Environment variable overrides
//! - Multiple config file locations
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./greenhouse.toml` - Project-local configuration
//! 2. `~/.config/greenhouse/config.toml` - User configuration (XDG)
//! 3. `~/.greenhouse/config.toml` - User configuration (legacy)
//! 4. `/etc/greenhouse/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `GREENHOUSE_MODE` - Inference mode (mamdani, sugeno)
//! - `GREENHOUSE_LOG_LEVEL` - Logging verbosity (quiet, normal, verbose, debug)
//! - `GREENHOUSE_EPISODES` - Training episodes
//! - `GREENHOUSE_SEED` - Random seed for training and environment noise
//! - `GREENHOUSE_STORE` - Table store backend (file, sqlite, memory)
//! - `GREENHOUSE_STORE_PATH` - Table store location
//! - `GREENHOUSE_NOISE_SIGMA` - Environment noise standard deviation
//!
//! # Example Configuration
//!
//! ```toml
//! # greenhouse.toml
//!
//! [general]
//! log_level = "normal"
//!
//! [controller]
//! mode = "sugeno"
//!
//! [training]
//! episodes = 1000
//! seed = 42
//!
//! [store]
//! backend = "sqlite"
//! path = "greenhouse.db"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::environment::PhysicsParams;
use crate::error::{ErrorCode, GreenhouseError};
use crate::fuzzy::EngineMode;
use crate::learning::AgentConfig;
use crate::store::StoreBackend;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GreenhouseConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Inference engine settings
    pub controller: ControllerConfig,
    /// Q-learning settings
    pub training: TrainingConfig,
    /// Simulated greenhouse settings
    pub environment: EnvironmentConfig,
    /// Table persistence settings
    pub store: StoreConfig,
}

/// General configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Logging level
    pub log_level: LogLevel,
}

/// Inference engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Inference mode
    pub mode: EngineMode,
    /// Output grid spacing for Mamdani centroid defuzzification
    pub centroid_step: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            mode: EngineMode::Sugeno,
            centroid_step: 1.0,
        }
    }
}

/// Q-learning configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    pub steps_per_episode: usize,
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    /// Seed for exploration and environment noise (random when unset)
    pub seed: Option<u64>,
    /// Episodes between progress log lines
    pub progress_interval: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let agent = AgentConfig::default();
        Self {
            episodes: 200,
            steps_per_episode: agent.steps_per_episode,
            alpha: agent.alpha,
            gamma: agent.gamma,
            epsilon: agent.epsilon,
            epsilon_decay: agent.epsilon_decay,
            epsilon_min: agent.epsilon_min,
            seed: None,
            progress_interval: agent.progress_interval,
        }
    }
}

impl TrainingConfig {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::builder()
            .alpha(self.alpha)
            .gamma(self.gamma)
            .epsilon(self.epsilon)
            .epsilon_decay(self.epsilon_decay)
            .epsilon_min(self.epsilon_min)
            .steps_per_episode(self.steps_per_episode)
            .progress_interval(self.progress_interval)
            .build()
    }
}

/// Simulated greenhouse configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Standard deviation of per-step noise (0 disables noise)
    pub noise_sigma: f64,
    pub optimal_temperature: f64,
    pub optimal_humidity: f64,
    pub external_temperature: f64,
    pub external_humidity: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        let physics = PhysicsParams::default();
        Self {
            noise_sigma: physics.noise_sigma,
            optimal_temperature: physics.optimal_temperature,
            optimal_humidity: physics.optimal_humidity,
            external_temperature: physics.external_temperature,
            external_humidity: physics.external_humidity,
        }
    }
}

impl EnvironmentConfig {
    pub fn physics_params(&self) -> PhysicsParams {
        PhysicsParams {
            noise_sigma: self.noise_sigma,
            optimal_temperature: self.optimal_temperature,
            optimal_humidity: self.optimal_humidity,
            external_temperature: self.external_temperature,
            external_humidity: self.external_humidity,
            ..PhysicsParams::default()
        }
    }
}

/// Table store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend type
    pub backend: StoreBackend,
    /// Blob file or database path
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            path: PathBuf::from("q_table.bin"),
        }
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Logging verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "0" => Some(LogLevel::Quiet),
            "normal" | "n" | "1" => Some(LogLevel::Normal),
            "verbose" | "v" | "2" => Some(LogLevel::Verbose),
            "debug" | "d" | "3" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// Default `env_logger` filter for this level
    pub fn filter(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "error",
            LogLevel::Normal => "info",
            LogLevel::Verbose => "debug",
            LogLevel::Debug => "trace",
        }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl GreenhouseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the first config file found, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::load_from_file(&path)?;
                break;
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;

        let config: GreenhouseConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(config)
    }

    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(PathBuf::from("<string>"), e.to_string()))
    }

    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Project-local
        paths.push(PathBuf::from("./greenhouse.toml"));

        // XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("greenhouse").join("config.toml"));
        }

        // Legacy home directory
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".greenhouse").join("config.toml"));
        }

        // System-wide (Unix only)
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/greenhouse/config.toml"));

        paths
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply `GREENHOUSE_*` overrides from an arbitrary lookup. Unparseable
    /// values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("GREENHOUSE_MODE") {
            match EngineMode::from_str(&val) {
                Some(mode) => self.controller.mode = mode,
                None => log::warn!("ignoring GREENHOUSE_MODE={}", val),
            }
        }

        if let Some(val) = lookup("GREENHOUSE_LOG_LEVEL") {
            match LogLevel::from_str(&val) {
                Some(level) => self.general.log_level = level,
                None => log::warn!("ignoring GREENHOUSE_LOG_LEVEL={}", val),
            }
        }

        if let Some(val) = lookup("GREENHOUSE_EPISODES") {
            match val.parse::<usize>() {
                Ok(episodes) => self.training.episodes = episodes,
                Err(_) => log::warn!("ignoring GREENHOUSE_EPISODES={}", val),
            }
        }

        if let Some(val) = lookup("GREENHOUSE_SEED") {
            match val.parse::<u64>() {
                Ok(seed) => self.training.seed = Some(seed),
                Err(_) => log::warn!("ignoring GREENHOUSE_SEED={}", val),
            }
        }

        if let Some(val) = lookup("GREENHOUSE_STORE") {
            match StoreBackend::from_str(&val) {
                Some(backend) => self.store.backend = backend,
                None => log::warn!("ignoring GREENHOUSE_STORE={}", val),
            }
        }

        if let Some(val) = lookup("GREENHOUSE_STORE_PATH") {
            self.store.path = PathBuf::from(val);
        }

        if let Some(val) = lookup("GREENHOUSE_NOISE_SIGMA") {
            match val.parse::<f64>() {
                Ok(sigma) => self.environment.noise_sigma = sigma,
                Err(_) => log::warn!("ignoring GREENHOUSE_NOISE_SIGMA={}", val),
            }
        }
    }

    /// Reject hyperparameters the learner and engines cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.training;
        let invalid = |key: &str, reason: &str| Err(ConfigError::InvalidValue(key.to_string(), reason.to_string()));

        if !(t.alpha > 0.0 && t.alpha <= 1.0) {
            return invalid("training.alpha", "must be in (0, 1]");
        }
        if !(0.0..=1.0).contains(&t.gamma) {
            return invalid("training.gamma", "must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&t.epsilon) {
            return invalid("training.epsilon", "must be in [0, 1]");
        }
        if !(t.epsilon_decay > 0.0 && t.epsilon_decay <= 1.0) {
            return invalid("training.epsilon_decay", "must be in (0, 1]");
        }
        if !(0.0..=1.0).contains(&t.epsilon_min) || t.epsilon_min > t.epsilon {
            return invalid("training.epsilon_min", "must be in [0, epsilon]");
        }
        if t.episodes == 0 {
            return invalid("training.episodes", "must be at least 1");
        }
        if t.steps_per_episode == 0 {
            return invalid("training.steps_per_episode", "must be at least 1");
        }
        if !(self.controller.centroid_step > 0.0) {
            return invalid("controller.centroid_step", "must be positive");
        }
        if !(self.environment.noise_sigma >= 0.0) || !self.environment.noise_sigma.is_finite() {
            return invalid("environment.noise_sigma", "must be finite and non-negative");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))
    }

    pub fn default_config_content() -> &'static str {
        r#"# Greenhouse controller configuration

[general]
# Logging level: quiet, normal, verbose, debug
log_level = "normal"

[controller]
# Inference mode: mamdani, sugeno
mode = "sugeno"
# Output grid spacing used by Mamdani centroid defuzzification
centroid_step = 1.0

[training]
episodes = 200
steps_per_episode = 50
# Learning rate
alpha = 0.1
# Discount factor
gamma = 0.9
# Exploration: initial rate, per-episode decay and floor
epsilon = 1.0
epsilon_decay = 0.995
epsilon_min = 0.01
# Fixed seed for reproducible runs (optional)
# seed = 42
# Episodes between progress log lines
progress_interval = 100

[environment]
# Per-step Gaussian noise; 0 disables it
noise_sigma = 0.1
optimal_temperature = 25.0
optimal_humidity = 70.0
external_temperature = 35.0
external_humidity = 40.0

[store]
# Backend: file, sqlite, memory
backend = "file"
# Blob file or database path
path = "q_table.bin"
"#
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// IO error reading/writing config file
    IoError(PathBuf, String),
    /// Parse error in config file
    ParseError(PathBuf, String),
    /// Serialization error
    SerializeError(String),
    /// Value outside its allowed range
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, msg) => {
                write!(f, "IO error reading {}: {}", path.display(), msg)
            }
            ConfigError::ParseError(path, msg) => {
                write!(f, "Parse error in {}: {}", path.display(), msg)
            }
            ConfigError::SerializeError(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            ConfigError::InvalidValue(key, msg) => {
                write!(f, "Invalid value for {}: {}", key, msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for GreenhouseError {
    fn from(err: ConfigError) -> Self {
        let code = match &err {
            ConfigError::ParseError(..) => ErrorCode::InvalidConfigSyntax,
            ConfigError::InvalidValue(..) => ErrorCode::InvalidConfigValue,
            _ => ErrorCode::ConfigError,
        };
        let hint = match &err {
            ConfigError::InvalidValue(key, _) => Some(format!("check `{}` in your greenhouse.toml", key)),
            _ => None,
        };
        let error = GreenhouseError::config(err.to_string()).with_code(code);
        match hint {
            Some(hint) => error.with_hint(hint),
            None => error,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = GreenhouseConfig::new();
        assert_eq!(config.controller.mode, EngineMode::Sugeno);
        assert_eq!(config.training.episodes, 200);
        assert_eq!(config.training.steps_per_episode, 50);
        assert_eq!(config.training.gamma, 0.9);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [general]
            log_level = "verbose"

            [controller]
            mode = "mamdani"

            [training]
            episodes = 1000
            seed = 42

            [store]
            backend = "sqlite"
            path = "greenhouse.db"
        "#;

        let config = GreenhouseConfig::load_from_str(toml).unwrap();
        assert_eq!(config.general.log_level, LogLevel::Verbose);
        assert_eq!(config.controller.mode, EngineMode::Mamdani);
        assert_eq!(config.training.episodes, 1000);
        assert_eq!(config.training.seed, Some(42));
        assert_eq!(config.training.alpha, 0.1);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.path, PathBuf::from("greenhouse.db"));
    }

    #[test]
    fn test_default_content_matches_defaults() {
        let parsed = GreenhouseConfig::load_from_str(GreenhouseConfig::default_config_content()).unwrap();
        assert_eq!(parsed, GreenhouseConfig::default());
    }

    #[test]
    fn test_parse_error() {
        let err = GreenhouseConfig::load_from_str("[training\nepisodes = 3").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
        assert_eq!(GreenhouseError::from(err).code, ErrorCode::InvalidConfigSyntax);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GREENHOUSE_MODE", "mamdani"),
            ("GREENHOUSE_EPISODES", "25"),
            ("GREENHOUSE_SEED", "7"),
            ("GREENHOUSE_STORE", "memory"),
            ("GREENHOUSE_NOISE_SIGMA", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = GreenhouseConfig::new();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.controller.mode, EngineMode::Mamdani);
        assert_eq!(config.training.episodes, 25);
        assert_eq!(config.training.seed, Some(7));
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.environment.noise_sigma, 0.1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GreenhouseConfig::new();
        config.training.alpha = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(key, _)) if key == "training.alpha"));

        let mut config = GreenhouseConfig::new();
        config.training.epsilon = 0.005;
        assert!(config.validate().is_err());

        let mut config = GreenhouseConfig::new();
        config.environment.noise_sigma = -1.0;
        let err = GreenhouseError::from(config.validate().unwrap_err());
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_conversions() {
        let mut config = GreenhouseConfig::new();
        config.training.alpha = 0.3;
        config.environment.noise_sigma = 0.0;

        let agent = config.training.agent_config();
        assert_eq!(agent.alpha, 0.3);
        assert_eq!(agent.epsilon_min, 0.01);

        let physics = config.environment.physics_params();
        assert_eq!(physics.noise_sigma, 0.0);
        assert_eq!(physics.k_mist_hum, 0.2);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(LogLevel::from_str("quiet"), Some(LogLevel::Quiet));
        assert_eq!(LogLevel::from_str("3"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::Normal.filter(), "info");
        assert_eq!(LogLevel::Verbose.filter(), "debug");
    }

    #[test]
    fn test_serialize_config() {
        let config = GreenhouseConfig::new();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[controller]"));
        assert!(toml.contains("[training]"));
        assert!(toml.contains("[store]"));
    }

    #[test]
    fn test_config_paths() {
        let paths = GreenhouseConfig::config_paths();
        assert!(!paths.is_empty());
        assert!(paths[0].ends_with("greenhouse.toml"));
    }
}
