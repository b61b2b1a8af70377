//! # weft-graph: Machine descriptions for `Weft`
//!
//! A [`Machine`] is the immutable description of one workflow state machine:
//! a mapping from state name to definition (routine or nested sub-machine)
//! plus an ordered transition table. Machines are built either directly via
//! [`MachineBuilder`] or from a textual graph description in a DOT subset
//! ([`Machine::from_dot`]).
//!
//! All structural invariants are checked once, at construction; queries
//! ([`Machine::successors`], [`Machine::classify`]) never fail afterwards.

pub mod dot;
pub mod error;
pub mod machine;


pub use error::GraphError;
pub use machine::{Machine, MachineBuilder, StateDef, Transition};
