//! The state-routine protocol and the routine registry.
//!
//! A routine is a resumable unit of work: each call to [`Routine::advance`]
//! either yields the next [`Instruction`] or reports completion. The engine
//! instantiates routines fresh on every state entry through factories held
//! in a [`RoutineRegistry`].

use std::collections::BTreeMap;

use weft_types::{Payload, StateName};

use crate::instruction::Instruction;

/// Structured input a routine receives when its state is (re-)entered.
#[derive(Debug, Clone)]
pub struct RoutineInput {
    /// The state being entered.
    pub state: StateName,
    /// Carry payload of the transition that brought execution here.
    pub payload: Option<Payload>,
}

/// One step of a routine's execution.
#[derive(Debug)]
pub enum Step {
    /// The routine produced an instruction and is suspended.
    Yield(Instruction),
    /// The routine has no more instructions.
    Done,
}

/// A resumable state routine.
///
/// The engine calls `advance(None)` to move past entry or a no-reply
/// yield, and `advance(Some(reply))` exactly once after the routine
/// yielded a `request_input`. Errors are reported to the host as `error`
/// instructions and pop the routine's machine.
pub trait Routine {
    fn advance(&mut self, reply: Option<String>) -> Result<Step, anyhow::Error>;
}

/// Factory invoked on every entry into a state.
pub type RoutineFactory = Box<dyn Fn(RoutineInput) -> Box<dyn Routine> + Send + Sync>;

/// Mapping from state name to routine factory.
///
/// Keys are state names, optionally qualified by the sub-machine path they
/// live under (`"options/__start__"`). Resolution walks from the most
/// qualified path down to the bare name, so a routine shared by several
/// machines registers once under its bare name while a sub-machine can
/// shadow it under its own path.
#[derive(Default)]
pub struct RoutineRegistry {
    factories: BTreeMap<String, RoutineFactory>,
}

impl RoutineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under a (possibly path-qualified) state name.
    pub fn register<F>(mut self, state: impl Into<String>, factory: F) -> Self
    where
        F: Fn(RoutineInput) -> Box<dyn Routine> + Send + Sync + 'static,
    {
        self.factories.insert(state.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Resolves a state under a sub-machine scope to its factory key.
    ///
    /// Tries `scope[..n]/state` for shrinking `n`, ending with the bare
    /// state name.
    pub(crate) fn resolve(&self, scope: &[StateName], state: &StateName) -> Option<&RoutineFactory> {
        for depth in (0..=scope.len()).rev() {
            let key = Self::qualified_key(&scope[..depth], state);
            if let Some(factory) = self.factories.get(&key) {
                return Some(factory);
            }
        }
        None
    }

    pub(crate) fn qualified_key(scope: &[StateName], state: &StateName) -> String {
        let mut key = String::new();
        for part in scope {
            key.push_str(part.as_str());
            key.push('/');
        }
        key.push_str(state.as_str());
        key
    }

    /// Instantiates the routine bound to `state` under `scope`.
    pub(crate) fn instantiate(
        &self,
        scope: &[StateName],
        input: RoutineInput,
    ) -> Option<Box<dyn Routine>> {
        let factory = self.resolve(scope, &input.state)?;
        Some(factory(input))
    }
}

impl std::fmt::Debug for RoutineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutineRegistry")
            .field("states", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
