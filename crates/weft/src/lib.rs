//! # Weft
//!
//! Workflow state-machine runtime for interactive, human-in-the-loop flows.
//!
//! A host program supplies a directed graph of named states (optionally
//! nested into sub-machines) and a set of state routines; the runtime
//! drives execution and mediates every side effect through a typed
//! instruction stream.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Weft                              │
//! │  ┌─────────┐   ┌────────────┐   ┌──────────┐   ┌───────┐   │
//! │  │  Graph  │ → │  Routines  │ → │  Engine  │ → │ Host  │   │
//! │  │  (DOT)  │   │ (registry) │   │ (sched.) │   │ (I/O) │   │
//! │  └─────────┘   └────────────┘   └──────────┘   └───────┘   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use weft::{ConsoleHost, Instruction, Workflow, jump_to, script};
//!
//! let summary = Workflow::from_dot("digraph { __start__ -> hello; hello -> __end__; }")?
//!     .routine("__start__", |_| Box::new(jump_to("hello")))
//!     .routine("hello", |_| {
//!         Box::new(script([
//!             Instruction::notify("Hello from weft!"),
//!             Instruction::transition("__end__"),
//!         ]))
//!     })
//!     .run(ConsoleHost::new())?;
//! ```

mod workflow;

pub use workflow::{Workflow, WorkflowError};

// Graph layer
pub use weft_graph::{GraphError, Machine, MachineBuilder, StateDef, Transition};

// Engine layer
pub use weft_engine::{
    DispatchMode, Engine, EngineError, Instruction, Routine, RoutineInput, RoutineRegistry,
    ScriptRoutine, Signal, Step, jump_to, routine_fn, script,
};

// Host layer
pub use weft_host::{ConsoleHost, Driver, DriverError, HostEvent, HostIo, RecordingHost, RunSummary};

// Shared vocabulary
pub use weft_types::{GuardLabel, Payload, StateClass, StateName};
