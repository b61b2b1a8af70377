//! # weft-engine: Cooperative scheduler for `Weft` workflows
//!
//! The engine drives state routines over a [`weft_graph::Machine`] and
//! mediates every externally visible action through a typed instruction
//! stream. It never performs I/O itself.
//!
//! ## Key principles
//!
//! - **No I/O**: routines yield [`Instruction`]s; the host executes them
//! - **Single thread of control**: engine, routines, and host take turns
//!   through the bidirectional `next`/`reply` protocol
//! - **No shared state**: the only channel across a transition is its
//!   explicit carry payload
//!
//! ## Example
//!
//! ```ignore
//! use weft_engine::{Engine, Signal};
//!
//! let mut engine = Engine::new(machine, registry)?;
//! loop {
//!     match engine.next()? {
//!         Signal::Instruction(instruction) => {
//!             // Perform the instruction; call engine.reply(..) after
//!             // a request_input.
//!         }
//!         Signal::Terminated => break,
//!     }
//! }
//! ```

pub mod engine;
pub mod instruction;
pub mod routine;
pub mod script;

#[cfg(test)]
mod tests;

pub use engine::{DispatchMode, Engine, EngineError, Signal};
pub use instruction::Instruction;
pub use routine::{Routine, RoutineInput, RoutineRegistry, Step};
pub use script::{ScriptRoutine, jump_to, routine_fn, script};
