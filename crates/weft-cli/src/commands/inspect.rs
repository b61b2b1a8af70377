//! Canonical rendering of a graph description.

use anyhow::{Context, Result};
use weft::Machine;

use super::graph_source::read_source;

pub fn run(path: Option<&str>) -> Result<()> {
    let (path, source) = read_source(path)?;
    let machine = Machine::from_dot(&source)
        .with_context(|| format!("Invalid graph in {}", path.display()))?;

    print!("{}", machine.to_dot());
    Ok(())
}
