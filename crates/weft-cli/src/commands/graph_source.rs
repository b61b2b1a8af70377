//! Shared path resolution for graph-consuming commands.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use weft_config::ConfigLoader;

/// Resolves the graph path: explicit argument first, then `run.graph`
/// from the configuration.
pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = path {
        return Ok(PathBuf::from(path));
    }
    let config = ConfigLoader::new().load_or_default();
    match config.run.graph {
        Some(path) => Ok(path),
        None => bail!("no graph path given and no `run.graph` configured"),
    }
}

/// Reads the graph description at the resolved path.
pub fn read_source(path: Option<&str>) -> Result<(PathBuf, String)> {
    let path = resolve_path(path)?;
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok((path, source))
}
