//! Burner configuration read from TOML.
//!
//! ```toml
//! [integrator]
//! max_steps = 10000
//! jacobian = "numerical"
//!
//! [tolerances]
//! rtol_spec = 1e-8
//!
//! [thermo]
//! renormalize_abundances = true
//!
//! [log]
//! level = "debug"
//! ```
//! Every table and every key may be omitted and falls back to its default.
use crate::Utils::logger::LogSettings;
use crate::numerical::VODE::VODE_type::VodeTuning;
use crate::numerical::burn::burn_type::{BurnTolerances, ThermoSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// largest accepted mass fraction floor
pub const MAX_SMALL_X_SAFE: f64 = 1.0e-3;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read configuration: {}", e),
            ConfigError::Parse(e) => write!(f, "cannot parse configuration: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnerConfig {
    pub integrator: VodeTuning,
    pub tolerances: BurnTolerances,
    pub thermo: ThermoSettings,
    pub log: LogSettings,
}

impl BurnerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BurnerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.integrator
            .validate()
            .map_err(|msg| ConfigError::Invalid(format!("[integrator] {}", msg)))?;
        self.tolerances
            .validate()
            .map_err(|msg| ConfigError::Invalid(format!("[tolerances] {}", msg)))?;
        let thermo = &self.thermo;
        if !(thermo.small_x_safe > 0.0 && thermo.small_x_safe <= MAX_SMALL_X_SAFE) {
            return Err(ConfigError::Invalid(format!(
                "[thermo] small_x_safe must be in (0, {:e}]",
                MAX_SMALL_X_SAFE
            )));
        }
        if !(thermo.max_temp > 0.0) || !(thermo.dT_crit >= 0.0) {
            return Err(ConfigError::Invalid(
                "[thermo] max_temp must be positive and dT_crit non-negative".to_string(),
            ));
        }
        self.log.level_filter()?;
        Ok(())
    }
}
