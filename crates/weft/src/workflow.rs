//! High-level workflow facade.
//!
//! Bundles a machine, a routine registry, and a dispatch mode into one
//! fluent builder, for hosts that do not need to drive the engine by hand.

use weft_engine::{DispatchMode, Engine, EngineError, Routine, RoutineInput, RoutineRegistry};
use weft_graph::{GraphError, Machine};
use weft_host::{Driver, DriverError, HostIo, RunSummary};

/// Anything that can go wrong between a graph description and a finished
/// run.
#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Builder tying a [`Machine`] to its routines.
///
/// ```ignore
/// let engine = Workflow::new(machine)
///     .routine("__start__", |_| Box::new(jump_to("work")))
///     .routine("work", make_work_routine)
///     .build()?;
/// ```
pub struct Workflow {
    machine: Machine,
    registry: RoutineRegistry,
    mode: DispatchMode,
    debug: bool,
}

impl Workflow {
    pub fn new(machine: Machine) -> Self {
        Self {
            machine,
            registry: RoutineRegistry::new(),
            mode: DispatchMode::default(),
            debug: false,
        }
    }

    /// Parses a DOT-subset graph description.
    pub fn from_dot(source: &str) -> Result<Self, WorkflowError> {
        Ok(Self::new(Machine::from_dot(source)?))
    }

    /// Registers a routine factory for a state (path-qualified names reach
    /// into sub-machines).
    pub fn routine<F>(mut self, state: impl Into<String>, factory: F) -> Self
    where
        F: Fn(RoutineInput) -> Box<dyn Routine> + Send + Sync + 'static,
    {
        self.registry = self.registry.register(state, factory);
        self
    }

    /// Switch to graph-driven dispatch (guard-label matching).
    pub fn graph_driven(mut self) -> Self {
        self.mode = DispatchMode::GraphDriven;
        self
    }

    /// Show `debug` instructions when running through [`Workflow::run`].
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Builds the engine, validating the registry against the graph.
    pub fn build(self) -> Result<Engine, WorkflowError> {
        Ok(Engine::with_mode(self.machine, self.registry, self.mode)?)
    }

    /// Builds the engine and drives it to completion against `host`.
    pub fn run<H: HostIo>(self, host: H) -> Result<RunSummary, WorkflowError> {
        let debug = self.debug;
        let mut engine = self.build()?;
        let mut driver = Driver::new(host).with_debug(debug);
        Ok(driver.run(&mut engine)?)
    }
}
