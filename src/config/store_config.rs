use crate::Result;
use ohno::{EnrichableExt, IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Sizing and growth policy for a store.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Variable capacity of a newly created store
    #[serde(default = "default_variable_capacity")]
    pub initial_variable_capacity: u32,

    /// File capacity of a newly created store
    #[serde(default = "default_file_capacity")]
    pub initial_file_capacity: u32,

    /// Used/capacity ratio at which a table grows
    #[serde(default = "default_load_factor")]
    pub load_factor: f64,

    /// Multiplier applied to the variable capacity on growth
    #[serde(default = "default_variable_growth")]
    pub variable_growth: f64,

    /// Multiplier applied to the file capacity on growth
    #[serde(default = "default_file_growth")]
    pub file_growth: f64,

    /// File name of the inconsistency log, created beside the store
    #[serde(default = "default_inconsistency_log")]
    pub inconsistency_log: String,
}

const fn default_variable_capacity() -> u32 {
    150
}

const fn default_file_capacity() -> u32 {
    2000
}

const fn default_load_factor() -> f64 {
    0.85
}

const fn default_variable_growth() -> f64 {
    1.25
}

const fn default_file_growth() -> f64 {
    2.0
}

fn default_inconsistency_log() -> String {
    "inconsistencies.log".to_string()
}

impl StoreConfig {
    /// Load configuration from a file or use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds out-of-range values
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let Some(path) = config_path else {
            return Ok(Self::default());
        };

        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading store configuration file '{}'", path.display()))?;
        Self::from_toml(&text).map_err(|e| e.enrich_with(|| format!("loading store configuration file '{}'", path.display())))
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this structure, or holds out-of-range values
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).into_app_err("parsing store configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if a capacity is zero, the load factor is outside (0, 1], or a growth factor does not grow
    pub fn validate(&self) -> Result<()> {
        if self.initial_variable_capacity == 0 || self.initial_file_capacity == 0 {
            return Err(app_err!(
                "initial capacities must be at least 1, got {} variables and {} files",
                self.initial_variable_capacity,
                self.initial_file_capacity
            ));
        }

        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(app_err!("load_factor must be in (0, 1], got {}", self.load_factor));
        }

        if !(self.variable_growth > 1.0) || !(self.file_growth > 1.0) {
            return Err(app_err!(
                "growth factors must be greater than 1, got variable_growth {} and file_growth {}",
                self.variable_growth,
                self.file_growth
            ));
        }

        if self.inconsistency_log.trim().is_empty() {
            return Err(app_err!("inconsistency_log must name a file"));
        }

        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to StoreConfig")
    }
}
