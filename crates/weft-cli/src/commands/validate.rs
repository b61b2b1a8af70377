//! Graph validation: parse a description and report its structure.

use anyhow::{Context, Result};
use console::style;
use weft::{Machine, StateClass};

use super::graph_source::read_source;

pub fn run(path: Option<&str>) -> Result<()> {
    let (path, source) = read_source(path)?;
    let machine = Machine::from_dot(&source)
        .with_context(|| format!("Invalid graph in {}", path.display()))?;

    println!(
        "{} {} states, {} transitions",
        style("✓").green().bold(),
        machine.state_count(),
        machine.transition_count()
    );
    println!();

    println!("{}", style("States").bold());
    for state in machine.states() {
        let class = match machine.classify(state) {
            Some(StateClass::Terminal) => "terminal",
            Some(StateClass::SubMachine) => "sub-machine",
            Some(StateClass::Routine) | None => "routine",
        };
        println!("  {} {}", state, style(format!("({class})")).dim());
    }
    println!();

    println!("{}", style("Transitions").bold());
    for transition in machine.transitions() {
        if transition.guard.is_unconditional() {
            println!("  {} -> {}", transition.source, transition.target);
        } else {
            println!(
                "  {} -> {} {}",
                transition.source,
                transition.target,
                style(format!("[{}]", transition.guard)).yellow()
            );
        }
    }

    Ok(())
}
