use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::forecast::ForecastConfig;
use crate::impulse::DecayParameters;
use crate::logging::LogConfig;
use crate::pmc::PmcConfig;
use crate::recovery::RecoveryWeights;
use crate::wellness::DEFAULT_BASELINE;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Impulse-response model settings
    pub model: ModelConfig,

    /// Chronic/acute load tracker settings
    pub pmc: PmcConfig,

    /// Recovery score settings
    pub recovery: RecoverySettings,

    /// Forecast horizon limits
    pub forecast: ForecastConfig,

    /// Logging settings
    pub logging: LogConfig,

    /// Data file locations
    pub data: DataSettings,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Impulse-response model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Wellness score with no residual effects
    pub baseline: f64,

    /// Decay shape for training without personalized parameters
    pub training: DecayParameters,
}

/// Recovery score settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverySettings {
    /// Most recent samples averaged into a personal baseline
    pub baseline_window_days: usize,

    /// Samples required before a baseline is trusted
    pub min_baseline_samples: usize,

    /// Component weights
    pub weights: RecoveryWeights,
}

/// Data file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// JSON data bundle with check-ins, factor catalog and parameters
    pub data_file: PathBuf,

    /// Default directory for exports
    pub export_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            model: ModelConfig::default(),
            pmc: PmcConfig::default(),
            recovery: RecoverySettings::default(),
            forecast: ForecastConfig::default(),
            logging: LogConfig::default(),
            data: DataSettings::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            baseline: DEFAULT_BASELINE,
            training: DecayParameters::TRAINING,
        }
    }
}

impl Default for RecoverySettings {
    fn default() -> Self {
        RecoverySettings {
            baseline_window_days: 30,
            min_baseline_samples: 7,
            weights: RecoveryWeights::default(),
        }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            data_file: PathBuf::from("./data/readyrs.json"),
            export_dir: PathBuf::from("./exports"),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".readyrs")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Config file not usable, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Check values that would make the model meaningless
    pub fn validate(&self) -> Result<()> {
        self.model
            .training
            .validate()
            .with_context(|| "Invalid training decay parameters")?;

        if !self.model.baseline.is_finite() {
            anyhow::bail!("Model baseline must be finite");
        }
        if self.pmc.ctl_time_constant <= 0.0 || self.pmc.atl_time_constant <= 0.0 {
            anyhow::bail!("Load time constants must be positive");
        }
        if self.forecast.min_days == 0 || self.forecast.min_days > self.forecast.max_days {
            anyhow::bail!(
                "Invalid forecast horizon limits: {}..={}",
                self.forecast.min_days,
                self.forecast.max_days
            );
        }
        if self.recovery.weights.total() <= 0.0 {
            anyhow::bail!("Recovery weights must sum to a positive value");
        }
        Ok(())
    }
}
