//! Configuration file locations.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::ConfigError;

/// Where weft looks for its configuration files.
pub struct Paths {
    project_dirs: Option<ProjectDirs>,
}

impl Paths {
    pub fn new() -> Self {
        Self {
            project_dirs: ProjectDirs::from("run", "Weft", "weft"),
        }
    }

    /// User config file (~/.config/weft/config.toml).
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        self.project_dirs
            .as_ref()
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or_else(|| {
                ConfigError::XdgError("no home directory to resolve user config".to_string())
            })
    }

    /// Project config file (weft.toml).
    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("weft.toml")
    }

    /// Local overrides (weft.local.toml, gitignored).
    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("weft.local.toml")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn project_paths_join_the_project_dir() {
        let dir = tempdir().expect("temp dir");
        assert_eq!(
            Paths::project_config_file(dir.path()),
            dir.path().join("weft.toml")
        );
        assert_eq!(
            Paths::local_config_file(dir.path()),
            dir.path().join("weft.local.toml")
        );
    }
}
