//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("XDG directory error: {0}")]
    XdgError(String),
}
