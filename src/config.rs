//! Configuration for the reconciliation engine.
//!
//! Configuration is loaded with precedence: Env vars > Config file > Defaults
//!
//! # Example config file (unikey.toml)
//! ```toml
//! [startup]
//! auto_reconcile = true
//!
//! [reconcile]
//! fold_loser_fields = true
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Startup sweep behavior
    pub startup: StartupConfig,
    /// Reconciliation behavior
    pub reconcile: ReconcileConfig,
}

impl EngineConfig {
    /// Load configuration with precedence: Env > File > Defaults
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(EngineConfig::default()));

        // Layer 1: Config file (if provided)
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 2: Environment variables with UNIKEY_ prefix
        figment = figment.merge(Env::prefixed("UNIKEY_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }
}

/// Startup sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Run `auto_reconcile_if_needed` across registered kinds at startup.
    pub auto_reconcile: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            auto_reconcile: true,
        }
    }
}

/// Reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Fold loser-only fields into the winner before deleting losers.
    pub fold_loser_fields: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            fold_loser_fields: true,
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}
