//! The `Machine` description and its builder.
//!
//! A machine is immutable once built. Mutation during a run lives entirely
//! in the engine's frame stack; the machine itself is shared (sub-machines
//! are held behind `Arc` so entering one is a cheap clone of the handle).

use std::collections::BTreeMap;
use std::sync::Arc;

use weft_types::{GuardLabel, Payload, StateClass, StateName};

use crate::error::GraphError;

/// One directed edge of a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub source: StateName,
    pub target: StateName,
    /// Trimmed-equality guard; empty means unconditional.
    pub guard: GuardLabel,
}

/// What a declared state is.
#[derive(Debug, Clone)]
pub enum StateDef {
    /// Bound to a routine; the registry resolves the factory by state name.
    Routine,
    /// A nested machine, pushed onto the frame stack on entry.
    SubMachine(Arc<Machine>),
}

/// Immutable description of one workflow state machine.
///
/// Invariants (checked by [`MachineBuilder::build`]):
/// - `__start__` and `__end__` are declared;
/// - every transition endpoint is a declared state;
/// - state names are unique and non-empty;
/// - cycles are legal.
#[derive(Debug, Clone)]
pub struct Machine {
    states: BTreeMap<StateName, StateDef>,
    /// Declaration order of states, for canonical serialization.
    declaration_order: Vec<StateName>,
    /// Outgoing transitions per source, in declaration order.
    transitions: BTreeMap<StateName, Vec<Transition>>,
    /// Total number of transitions, in declaration order across sources.
    transition_order: Vec<(StateName, usize)>,
    /// Opaque per-state metadata from the `data` node attribute.
    state_data: BTreeMap<StateName, Payload>,
}

impl Machine {
    pub fn builder() -> MachineBuilder {
        MachineBuilder::default()
    }

    /// Parses a DOT-subset graph description into a machine.
    pub fn from_dot(source: &str) -> Result<Self, GraphError> {
        crate::dot::parse(source)
    }

    /// Renders the machine in canonical DOT form.
    ///
    /// Canonical form is stable: parsing it back yields a machine with the
    /// same states, the same ordered successors per state, and the same
    /// guards. Nested sub-machines are not expressible in the DOT subset
    /// and render as plain routine states.
    pub fn to_dot(&self) -> String {
        crate::dot::render(self)
    }

    /// Ordered outgoing transitions of `state`; empty when none.
    pub fn successors(&self, state: &StateName) -> &[Transition] {
        self.transitions.get(state).map_or(&[], Vec::as_slice)
    }

    /// Classifies a declared state; `None` for names not in this machine.
    ///
    /// `__end__` is always [`StateClass::Terminal`], regardless of any
    /// routine bound to that name.
    pub fn classify(&self, state: &StateName) -> Option<StateClass> {
        if !self.states.contains_key(state) {
            return None;
        }
        if state.is_end() {
            return Some(StateClass::Terminal);
        }
        match self.states.get(state) {
            Some(StateDef::Routine) => Some(StateClass::Routine),
            Some(StateDef::SubMachine(_)) => Some(StateClass::SubMachine),
            None => None,
        }
    }

    pub fn contains(&self, state: &StateName) -> bool {
        self.states.contains_key(state)
    }

    /// The nested machine behind `state`, when it is a sub-machine.
    pub fn sub_machine(&self, state: &StateName) -> Option<&Arc<Machine>> {
        match self.states.get(state) {
            Some(StateDef::SubMachine(inner)) => Some(inner),
            _ => None,
        }
    }

    /// Opaque `data` attribute of a state, when present.
    pub fn state_data(&self, state: &StateName) -> Option<&Payload> {
        self.state_data.get(state)
    }

    /// Declared states in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &StateName> {
        self.declaration_order.iter()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// All transitions in declaration order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transition_order
            .iter()
            .map(|(source, idx)| &self.transitions[source][*idx])
    }

    pub fn transition_count(&self) -> usize {
        self.transition_order.len()
    }
}

impl PartialEq for Machine {
    /// Machines are equivalent when they declare the same states (with the
    /// same classification and nesting) and the same ordered, guarded
    /// successors per state. Declaration order of states is not significant.
    fn eq(&self, other: &Self) -> bool {
        if self.states.len() != other.states.len() {
            return false;
        }
        for (name, def) in &self.states {
            let matches = match (def, other.states.get(name)) {
                (StateDef::Routine, Some(StateDef::Routine)) => true,
                (StateDef::SubMachine(a), Some(StateDef::SubMachine(b))) => a == b,
                _ => false,
            };
            if !matches {
                return false;
            }
            if self.successors(name) != other.successors(name) {
                return false;
            }
        }
        true
    }
}

impl Eq for Machine {}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Machine`]; validation happens in [`MachineBuilder::build`].
#[derive(Debug, Default)]
pub struct MachineBuilder {
    states: Vec<(StateName, StateDef)>,
    transitions: Vec<(StateName, StateName, GuardLabel)>,
    state_data: Vec<(StateName, Payload)>,
}

impl MachineBuilder {
    /// Declares a routine state. Re-declaring an existing routine state is
    /// a no-op (graph descriptions mention the same node many times).
    pub fn state(mut self, name: impl Into<StateName>) -> Self {
        let name = name.into();
        if !self.states.iter().any(|(n, _)| *n == name) {
            self.states.push((name, StateDef::Routine));
        }
        self
    }

    /// Declares a nested sub-machine state.
    ///
    /// A name previously declared implicitly (by a transition or a bare
    /// `state` call) is upgraded in place, so declaration order does not
    /// matter. Declaring two sub-machines under one name is rejected at
    /// [`MachineBuilder::build`].
    pub fn sub_machine(mut self, name: impl Into<StateName>, inner: Machine) -> Self {
        let name = name.into();
        let def = StateDef::SubMachine(Arc::new(inner));
        let existing = self.states.iter().position(|(n, _)| *n == name);
        match existing {
            Some(idx) if matches!(self.states[idx].1, StateDef::Routine) => {
                self.states[idx].1 = def;
            }
            _ => self.states.push((name, def)),
        }
        self
    }

    /// Declares an unconditional transition, implicitly declaring both
    /// endpoints as routine states if they are new.
    pub fn transition(self, source: impl Into<StateName>, target: impl Into<StateName>) -> Self {
        self.guarded(source, target, GuardLabel::unconditional())
    }

    /// Declares a guarded transition, implicitly declaring both endpoints.
    pub fn guarded(
        mut self,
        source: impl Into<StateName>,
        target: impl Into<StateName>,
        guard: impl Into<GuardLabel>,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        self = self.state(source.clone()).state(target.clone());
        self.transitions.push((source, target, guard.into()));
        self
    }

    /// Attaches opaque metadata to a state (the DOT `data` attribute).
    pub fn state_data(mut self, name: impl Into<StateName>, data: Payload) -> Self {
        self.state_data.push((name.into(), data));
        self
    }

    pub fn build(self) -> Result<Machine, GraphError> {
        let mut states = BTreeMap::new();
        let mut declaration_order = Vec::with_capacity(self.states.len());

        for (name, def) in self.states {
            if name.as_str().is_empty() {
                return Err(GraphError::EmptyStateName);
            }
            if name.is_reserved() && matches!(def, StateDef::SubMachine(_)) {
                return Err(GraphError::ReservedSubMachine(name));
            }
            if states.contains_key(&name) {
                // Explicit duplicate declarations with differing definitions
                // are an error; `state()` already deduplicates re-mentions.
                return Err(GraphError::DuplicateState(name));
            }
            declaration_order.push(name.clone());
            states.insert(name, def);
        }

        if !states.contains_key(&StateName::start()) {
            return Err(GraphError::MissingStart);
        }
        if !states.contains_key(&StateName::end()) {
            return Err(GraphError::MissingEnd);
        }

        let mut transitions: BTreeMap<StateName, Vec<Transition>> = BTreeMap::new();
        let mut transition_order = Vec::with_capacity(self.transitions.len());

        for (source, target, guard) in self.transitions {
            if !states.contains_key(&source) {
                return Err(GraphError::UnknownTransitionSource { src: source, target });
            }
            if !states.contains_key(&target) {
                return Err(GraphError::UnknownTransitionTarget { src: source, target });
            }
            let list = transitions.entry(source.clone()).or_default();
            transition_order.push((source.clone(), list.len()));
            list.push(Transition {
                source,
                target,
                guard,
            });
        }

        let state_data = self.state_data.into_iter().collect();

        Ok(Machine {
            states,
            declaration_order,
            transitions,
            transition_order,
            state_data,
        })
    }
}
