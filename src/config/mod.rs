//! Simulation configuration
//!
//! Loaded from an optional JSON file. Every field has a default, so an
//! empty object (or no file at all) yields the standard setup: 10 sites,
//! 20 variables, initial value `10 * k`.
//!
//! Placement rule:
//! - odd `xk` lives only at site `1 + (k mod num_sites)`
//! - even `xk` is replicated to every site

mod errors;

pub use errors::{ConfigError, ConfigResult};

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::CycleCriterion;
use crate::model::{SiteId, Value, VariableId};
use crate::observability::Severity;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of sites, numbered from 1 (default 10)
    #[serde(default = "default_num_sites")]
    pub num_sites: u32,

    /// Number of variables, numbered from 1 (default 20)
    #[serde(default = "default_num_variables")]
    pub num_variables: u32,

    /// Initial value of `xk` is `k * initial_value_factor` (default 10)
    #[serde(default = "default_initial_value_factor")]
    pub initial_value_factor: Value,

    /// Minimum log severity written to stderr (default "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Serialization graph cycle test (default "any_cycle")
    #[serde(default)]
    pub cycle_criterion: CycleCriterion,
}

fn default_num_sites() -> u32 {
    10
}
fn default_num_variables() -> u32 {
    20
}
fn default_initial_value_factor() -> Value {
    10
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_sites: default_num_sites(),
            num_variables: default_num_variables(),
            initial_value_factor: default_initial_value_factor(),
            log_level: default_log_level(),
            cycle_criterion: CycleCriterion::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: SimulationConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.num_sites == 0 {
            return Err(ConfigError::Invalid("num_sites must be > 0".into()));
        }
        if self.num_variables == 0 {
            return Err(ConfigError::Invalid("num_variables must be > 0".into()));
        }
        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }

    /// All site ids, ascending.
    pub fn site_ids(&self) -> impl Iterator<Item = SiteId> {
        (1..=self.num_sites).map(SiteId::new)
    }

    /// All variable ids, ascending.
    pub fn variable_ids(&self) -> impl Iterator<Item = VariableId> {
        (1..=self.num_variables).map(VariableId::new)
    }

    /// Sites holding a copy of `variable`.
    pub fn placement(&self, variable: VariableId) -> Vec<SiteId> {
        if variable.is_replicated() {
            self.site_ids().collect()
        } else {
            vec![SiteId::new(1 + variable.value() % self.num_sites)]
        }
    }

    /// Tick-0 value of `variable`.
    pub fn initial_value(&self, variable: VariableId) -> Value {
        Value::from(variable.value()) * self.initial_value_factor
    }
}
