//! Configuration management using Figment.
//!
//! Configuration is loaded from:
//! 1. A TOML file (base configuration, `config/calor_daq.toml` by default)
//! 2. Environment variables prefixed with `CALOR_DAQ_`, nested keys separated by
//!    a double underscore
//!
//! Every section has defaults, so a missing file yields the kit's stock setup
//! (100-entry history, 250 mL vessels, 4200 J/(kg·°C)).
//!
//! # Example
//! ```no_run
//! use calor_daq::config::CalorConfig;
//!
//! let config = CalorConfig::load()?;
//! config.validate()?;
//! println!("History capacity: {}", config.buffer.capacity);
//! # Ok::<(), calor_daq::error::CalorError>(())
//! ```
//!
//! `CALOR_DAQ_CALORIMETRY__SPECIFIC_HEAT=4186` overrides the specific heat.

use crate::calorimetry::{
    Vessel, DEFAULT_COLD_DENSITY, DEFAULT_HOT_DENSITY, DEFAULT_SPECIFIC_HEAT, DEFAULT_VOLUME_ML,
};
use crate::data::buffer::DEFAULT_CAPACITY;
use crate::error::{AppResult, CalorError};
use crate::validation;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/calor_daq.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalorConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// History buffer settings
    #[serde(default)]
    pub buffer: BufferConfig,
    /// Physical constants and vessel setup
    #[serde(default)]
    pub calorimetry: CalorimetryConfig,
    /// Persistence sink settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Transport and polling settings
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// History buffer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Number of retained readings
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// Calorimetry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorimetryConfig {
    /// Specific heat of water, J/(kg·°C)
    #[serde(default = "default_specific_heat")]
    pub specific_heat: f64,
    /// Cold water density, kg/m³
    #[serde(default = "default_cold_density")]
    pub cold_density: f64,
    /// Hot water density, kg/m³
    #[serde(default = "default_hot_density")]
    pub hot_density: f64,
    /// Initial cold volume, mL
    #[serde(default = "default_volume")]
    pub cold_volume_ml: f64,
    /// Initial hot volume, mL
    #[serde(default = "default_volume")]
    pub hot_volume_ml: f64,
}

/// Persistence configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Whether accepted readings are appended to disk
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Output file
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Topic the rig publishes on (shown in the status line)
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Snapshot poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Actor command queue capacity
    #[serde(default = "default_command_capacity")]
    pub command_channel_capacity: usize,
}

// Default value functions
fn default_name() -> String {
    "Calorimetry DAQ".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_specific_heat() -> f64 {
    DEFAULT_SPECIFIC_HEAT
}

fn default_cold_density() -> f64 {
    DEFAULT_COLD_DENSITY
}

fn default_hot_density() -> f64 {
    DEFAULT_HOT_DENSITY
}

fn default_volume() -> f64 {
    DEFAULT_VOLUME_ML
}

fn default_enabled() -> bool {
    true
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data_suhu.csv")
}

fn default_topic() -> String {
    "edukit/suhu".to_string()
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_command_capacity() -> usize {
    32
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl Default for CalorimetryConfig {
    fn default() -> Self {
        Self {
            specific_heat: default_specific_heat(),
            cold_density: default_cold_density(),
            hot_density: default_hot_density(),
            cold_volume_ml: default_volume(),
            hot_volume_ml: default_volume(),
        }
    }
}

impl CalorimetryConfig {
    /// Cold vessel at its configured volume.
    pub fn cold_vessel(&self) -> Vessel {
        Vessel::new(self.cold_density, self.cold_volume_ml)
    }

    /// Hot vessel at its configured volume.
    pub fn hot_vessel(&self) -> Vessel {
        Vessel::new(self.hot_density, self.hot_volume_ml)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            path: default_storage_path(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            poll_interval_ms: default_poll_interval(),
            command_channel_capacity: default_command_capacity(),
        }
    }
}

impl CalorConfig {
    /// Load configuration from the default path and environment variables.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Ok(Self::figment(path.as_ref()).extract()?)
    }

    /// The provider stack used by [`load_from`](Self::load_from).
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(CalorConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CALOR_DAQ_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |field: &str, msg: &str| CalorError::Configuration(format!("{field}: {msg}"));

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(CalorError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.to_lowercase().as_str()) {
            return Err(CalorError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            )));
        }

        validation::is_in_range(self.buffer.capacity, 1..=usize::MAX)
            .map_err(|m| invalid("buffer.capacity", m))?;

        let cal = &self.calorimetry;
        validation::is_positive(cal.specific_heat)
            .map_err(|m| invalid("calorimetry.specific_heat", m))?;
        validation::is_positive(cal.cold_density)
            .map_err(|m| invalid("calorimetry.cold_density", m))?;
        validation::is_positive(cal.hot_density)
            .map_err(|m| invalid("calorimetry.hot_density", m))?;
        validation::is_non_negative(cal.cold_volume_ml)
            .map_err(|m| invalid("calorimetry.cold_volume_ml", m))?;
        validation::is_non_negative(cal.hot_volume_ml)
            .map_err(|m| invalid("calorimetry.hot_volume_ml", m))?;

        validation::is_valid_path(&self.storage.path.to_string_lossy())
            .map_err(|m| invalid("storage.path", m))?;

        validation::is_not_empty(&self.transport.topic).map_err(|m| invalid("transport.topic", m))?;
        validation::is_in_range(self.transport.poll_interval_ms, 1..=u64::MAX)
            .map_err(|m| invalid("transport.poll_interval_ms", m))?;
        validation::is_in_range(self.transport.command_channel_capacity, 1..=usize::MAX)
            .map_err(|m| invalid("transport.command_channel_capacity", m))?;

        Ok(())
    }
}
