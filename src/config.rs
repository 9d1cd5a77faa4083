//! Runtime settings.
//!
//! Loaded from an optional `invsearch.toml` (any format the `config` crate knows works,
//! the extension picks it) and overridden by `INVSEARCH__*` environment variables,
//! e.g. `INVSEARCH__SEARCH__RESULTS_MAX=50`. Every field has a default.

use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

pub const DEFAULT_FILE: &str = "invsearch";
pub const ENV_PREFIX: &str = "INVSEARCH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fallback tracing filter when `RUST_LOG` is not set.
    pub log_filter: String,
    pub search: SearchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self { log_filter: "info".to_string(), search: SearchSettings::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Results after which a search completes early; also caps rendered output.
    pub results_max: usize,
    /// Matchables drawn per cycle.
    pub polls_per_cycle: usize,
    /// Delay between two cycles of one search.
    pub cycle_interval_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { results_max: 100, polls_per_cycle: 10, cycle_interval_ms: 50 }
    }
}

impl SearchSettings {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.results_max == 0 {
            return Err(SearchError::Config("search.results_max must be positive".into()));
        }
        if self.polls_per_cycle == 0 {
            return Err(SearchError::Config("search.polls_per_cycle must be positive".into()));
        }
        if self.cycle_interval_ms == 0 {
            return Err(SearchError::Config("search.cycle_interval_ms must be positive".into()));
        }
        Ok(())
    }
}

impl Settings {
    /// Settings from `invsearch.*` in the working directory and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_FILE)
    }

    /// Settings from the named file (extension optional, may be missing) and the environment.
    pub fn load_from(file: &str) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.search.validate()?;
        Ok(settings)
    }
}
