//! Convenience routine implementations.
//!
//! Most real routines are small hand-written state structs implementing
//! [`Routine`]; these helpers cover the recurring shapes: a fixed
//! instruction sequence, a single hop to another state, and closures for
//! reply-dependent logic.

use std::collections::VecDeque;

use weft_types::StateName;

use crate::instruction::Instruction;
use crate::routine::{Routine, Step};

/// Routine that yields a fixed sequence of instructions, then finishes.
///
/// Replies are accepted but ignored; use [`routine_fn`] when a reply has
/// to influence later steps.
pub struct ScriptRoutine {
    steps: VecDeque<Instruction>,
}

impl ScriptRoutine {
    pub fn new(steps: impl IntoIterator<Item = Instruction>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }
}

impl Routine for ScriptRoutine {
    fn advance(&mut self, _reply: Option<String>) -> Result<Step, anyhow::Error> {
        Ok(match self.steps.pop_front() {
            Some(instruction) => Step::Yield(instruction),
            None => Step::Done,
        })
    }
}

/// Builds a [`ScriptRoutine`] from a sequence of instructions.
pub fn script(steps: impl IntoIterator<Item = Instruction>) -> ScriptRoutine {
    ScriptRoutine::new(steps)
}

/// Routine that immediately transitions to `target`.
///
/// Useful for glue states such as a `__start__` that only forwards into
/// the first real state.
pub fn jump_to(target: impl Into<StateName>) -> ScriptRoutine {
    ScriptRoutine::new([Instruction::transition(target)])
}

/// Routine driven by a closure called once per advance.
///
/// The closure receives the reply (present only after a `request_input`
/// yield) and returns the next [`Step`].
pub fn routine_fn<F>(f: F) -> FnRoutine<F>
where
    F: FnMut(Option<String>) -> Result<Step, anyhow::Error>,
{
    FnRoutine { f }
}

/// See [`routine_fn`].
pub struct FnRoutine<F> {
    f: F,
}

impl<F> Routine for FnRoutine<F>
where
    F: FnMut(Option<String>) -> Result<Step, anyhow::Error>,
{
    fn advance(&mut self, reply: Option<String>) -> Result<Step, anyhow::Error> {
        (self.f)(reply)
    }
}
