//! Configuration management for Weft
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (`WEFT_*` prefix, highest precedence)
//! 2. weft.local.toml (gitignored, local overrides)
//! 3. weft.toml (git-tracked, project config)
//! 4. ~/.config/weft/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Weft configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeftConfig {
    pub run: RunConfig,
    pub console: ConsoleConfig,
}

/// How workflows are executed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Show `debug` instructions on the host stream.
    pub debug: bool,
    /// Graph description used when a command is given no path.
    pub graph: Option<PathBuf>,
}

/// Console host presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Print a separator when a state change is observed.
    pub transition_banners: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            transition_banners: true,
        }
    }
}
