//! Sequencer configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `SEQUENCER_EXIT_FLAGS`, `SEQUENCER_NAVIGATION_FLAG`,
//!    `SEQUENCER_SEED`, `SEQUENCER_LEGACY_PREFIXES`
//! 2. Config file (TOML)
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! navigation_flag = "nav"
//! exit_flags = "!busy"
//! default_group = "Group_1"
//! default_duration = 3.0
//! seed = 42
//! legacy_prefixes = true
//! ```

use crate::error::ConfigError;
use crate::graph::DEFAULT_MAX_NAME_ATTEMPTS;
use crate::state::{DEFAULT_DURATION, DEFAULT_GROUP};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sequencer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Token set when a navigation starts and cleared when it ends
    pub navigation_flag: String,
    /// Extra flags appended to every navigation-cleared broadcast
    pub exit_flags: String,
    /// Group for states created without one
    pub default_group: String,
    /// Duration given to new timed states
    pub default_duration: f32,
    /// Prefix for generated state names
    pub new_state_prefix: String,
    /// Retry cap for generated names
    pub max_name_attempts: u32,
    /// Minimum progress change that is re-emitted
    pub progress_epsilon: f32,
    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
    /// Infer kinds from `VS_`/`VT_`/`NAV_state` name prefixes on add and rename
    pub legacy_prefixes: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            navigation_flag: "nav".to_string(),
            exit_flags: String::new(),
            default_group: DEFAULT_GROUP.to_string(),
            default_duration: DEFAULT_DURATION,
            new_state_prefix: "state_".to_string(),
            max_name_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
            progress_epsilon: 1e-6,
            seed: None,
            legacy_prefixes: false,
        }
    }
}

impl SequencerConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded sequencer config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Defaults, then the file if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `SEQUENCER_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flags) = lookup("SEQUENCER_EXIT_FLAGS") {
            self.exit_flags = flags;
        }

        if let Some(flag) = lookup("SEQUENCER_NAVIGATION_FLAG") {
            if !flag.trim().is_empty() {
                self.navigation_flag = flag.trim().to_string();
            }
        }

        if let Some(seed) = lookup("SEQUENCER_SEED") {
            match seed.parse() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => log::warn!("Ignoring invalid SEQUENCER_SEED: {}", seed),
            }
        }

        if let Some(legacy) = lookup("SEQUENCER_LEGACY_PREFIXES") {
            self.legacy_prefixes = legacy == "1" || legacy.eq_ignore_ascii_case("true");
        }
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
