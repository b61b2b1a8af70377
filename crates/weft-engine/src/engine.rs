//! The execution engine.
//!
//! The engine owns the frame stack, drives the active state's routine,
//! consumes `transition`/`parent_transition` instructions internally, and
//! re-emits everything else to the host through [`Engine::next`].
//!
//! Scheduling is cooperative and single-threaded: the engine suspends only
//! when it hands an instruction to the host, and resumes on the next
//! [`Engine::next`] (or [`Engine::reply`] when input was requested).

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, trace};
use weft_graph::Machine;
use weft_types::{Payload, StateClass, StateName};

use crate::instruction::Instruction;
use crate::routine::{Routine, RoutineInput, RoutineRegistry, Step};

/// Message of the single terminal notify delivered when the top-level
/// machine reaches `__end__`.
pub(crate) const TERMINAL_MESSAGE: &str = "State machine reached '__end__' state.";

/// Who chooses the next state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Routines name their targets; the graph is advisory and consulted
    /// only to check that a target exists.
    #[default]
    RoutineDriven,
    /// Routines produce guard labels; the engine picks the first matching
    /// edge from the graph.
    GraphDriven,
}

/// What [`Engine::next`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// A host-directed instruction, to be performed before the next call.
    Instruction(Instruction),
    /// Nothing left to do. Subsequent calls keep returning this.
    Terminated,
}

/// Local protocol failures between engine and host.
///
/// Routine-level failures are not Rust errors: they surface as `error`
/// instructions on the host stream.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("no routine registered for state '{state}'")]
    UnregisteredRoutine { state: String },

    #[error("reply supplied without a pending input request")]
    UnsolicitedReply,

    #[error("engine advanced while an input request is unanswered")]
    PendingInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Running,
    AwaitingReply,
    Terminated,
}

/// One entry of the machine stack.
struct Frame {
    machine: Arc<Machine>,
    /// Sub-machine state names from the root down to this machine; used to
    /// resolve path-qualified routine registrations.
    scope: Vec<StateName>,
    current: StateName,
    /// Created lazily on first entry; discarded on every transition.
    routine: Option<Box<dyn Routine>>,
    /// Payload handed to the next routine instantiated in this frame.
    carry: Option<Payload>,
    /// Set when a child machine popped without redirecting this frame.
    /// The sub-machine state is then complete, and the no-transition rule
    /// applies to it on the next scheduling step.
    child_returned: bool,
}

impl Frame {
    fn new(machine: Arc<Machine>, scope: Vec<StateName>, carry: Option<Payload>) -> Self {
        Self {
            machine,
            scope,
            current: StateName::start(),
            routine: None,
            carry,
            child_returned: false,
        }
    }
}

/// The cooperative scheduler.
pub struct Engine {
    stack: Vec<Frame>,
    registry: RoutineRegistry,
    mode: DispatchMode,
    status: Status,
    pending_reply: Option<String>,
}

impl Engine {
    /// Builds a routine-driven engine over `machine`.
    ///
    /// Fails when a routine-classified state (of the machine or any nested
    /// sub-machine) has no factory in `registry`.
    pub fn new(machine: Machine, registry: RoutineRegistry) -> Result<Self, EngineError> {
        Self::with_mode(machine, registry, DispatchMode::default())
    }

    /// Builds an engine with an explicit dispatch mode.
    pub fn with_mode(
        machine: Machine,
        registry: RoutineRegistry,
        mode: DispatchMode,
    ) -> Result<Self, EngineError> {
        let mut scope = Vec::new();
        validate_registry(&machine, &mut scope, &registry)?;

        let root = Frame::new(Arc::new(machine), Vec::new(), None);

        Ok(Self {
            stack: vec![root],
            registry,
            mode,
            status: Status::Running,
            pending_reply: None,
        })
    }

    /// Advances execution until there is an instruction for the host or
    /// nothing left to do.
    pub fn next(&mut self) -> Result<Signal, EngineError> {
        match self.status {
            Status::Terminated => return Ok(Signal::Terminated),
            Status::AwaitingReply => return Err(EngineError::PendingInput),
            Status::Running => {}
        }

        loop {
            if self.stack.is_empty() {
                self.status = Status::Terminated;
                return Ok(Signal::Terminated);
            }

            // A machine whose current state is __end__ is finished: pop it.
            // The parent's current state is untouched by the child; its
            // sub-machine state is simply marked complete.
            if self
                .stack
                .last()
                .is_some_and(|frame| frame.current.is_end())
            {
                self.pop_machine();
                debug!(depth = self.stack.len(), "machine reached __end__");
                if self.stack.is_empty() {
                    self.status = Status::Terminated;
                    return Ok(Signal::Instruction(Instruction::notify_level(
                        "info",
                        TERMINAL_MESSAGE,
                    )));
                }
                continue;
            }

            // A frame resumes here after its child machine popped. Unless
            // the child redirected it via parent transition, the
            // sub-machine state finished without yielding a transition and
            // the no-transition rule applies to it.
            if self.stack.last().is_some_and(|frame| frame.child_returned) {
                if let Some(frame) = self.stack.last_mut() {
                    trace!(state = %frame.current, "sub-machine state complete");
                    frame.child_returned = false;
                    frame.current = StateName::end();
                    frame.routine = None;
                    frame.carry = None;
                }
                continue;
            }

            // Entering a sub-machine state pushes a child frame starting at
            // __start__; the carry moves into the child.
            let child = {
                let Some(frame) = self.stack.last_mut() else {
                    continue;
                };
                frame
                    .machine
                    .sub_machine(&frame.current)
                    .map(Arc::clone)
                    .map(|inner| {
                        let mut scope = frame.scope.clone();
                        scope.push(frame.current.clone());
                        Frame::new(inner, scope, frame.carry.take())
                    })
            };
            if let Some(child) = child {
                debug!(depth = self.stack.len() + 1, "entering sub-machine");
                self.stack.push(child);
                continue;
            }

            // Routine states: instantiate lazily, then advance.
            let reply = self.pending_reply.take();
            let step = {
                let Some(frame) = self.stack.last_mut() else {
                    continue;
                };
                if frame.routine.is_none() {
                    let input = RoutineInput {
                        state: frame.current.clone(),
                        payload: frame.carry.take(),
                    };
                    let state_key =
                        RoutineRegistry::qualified_key(&frame.scope, &frame.current);
                    let Some(routine) = self.registry.instantiate(&frame.scope, input) else {
                        return Err(EngineError::UnregisteredRoutine { state: state_key });
                    };
                    trace!(state = %frame.current, "routine instantiated");
                    frame.routine = Some(routine);
                }
                let Some(routine) = frame.routine.as_mut() else {
                    continue;
                };
                routine.advance(reply)
            };

            match step {
                Err(failure) => {
                    let state = self
                        .pop_machine()
                        .map_or_else(StateName::start, |frame| frame.current);
                    debug!(state = %state, "routine failed; machine popped");
                    return Ok(Signal::Instruction(Instruction::error_with(
                        format!("error in state '{state}': {failure}"),
                        json!({ "state": state.as_str(), "exception": failure.to_string() }),
                    )));
                }

                // A routine that finishes without a transition halts its
                // machine: equivalent to transitioning to __end__.
                Ok(Step::Done) => {
                    if let Some(frame) = self.stack.last_mut() {
                        trace!(state = %frame.current, "routine finished without transition");
                        frame.current = StateName::end();
                        frame.routine = None;
                        frame.carry = None;
                    }
                    continue;
                }

                Ok(Step::Yield(instruction)) => match instruction {
                    Instruction::Transition {
                        next_state,
                        label,
                        payload,
                    } => {
                        if let Some(error) = self.commit_transition(next_state, label, payload) {
                            return Ok(Signal::Instruction(error));
                        }
                        continue;
                    }

                    Instruction::ParentTransition {
                        next_state_for_parent,
                        payload,
                    } => {
                        if let Some(error) =
                            self.commit_parent_transition(next_state_for_parent, payload)
                        {
                            return Ok(Signal::Instruction(error));
                        }
                        continue;
                    }

                    Instruction::RequestInput { .. } => {
                        self.status = Status::AwaitingReply;
                        trace!("input requested; engine suspended");
                        return Ok(Signal::Instruction(instruction));
                    }

                    other => {
                        debug_assert!(other.is_host_directed());
                        return Ok(Signal::Instruction(other));
                    }
                },
            }
        }
    }

    /// Supplies the value requested by the last delivered `request_input`.
    ///
    /// Must be called exactly once per request, before the next
    /// [`Engine::next`].
    pub fn reply(&mut self, value: impl Into<String>) -> Result<(), EngineError> {
        if self.status != Status::AwaitingReply {
            return Err(EngineError::UnsolicitedReply);
        }
        self.pending_reply = Some(value.into());
        self.status = Status::Running;
        Ok(())
    }

    /// Current state of the active (top) machine, if any.
    ///
    /// Hosts that want to observe transitions watch this between
    /// deliveries; the engine never emits a transition instruction.
    pub fn current_state(&self) -> Option<&StateName> {
        self.stack.last().map(|frame| &frame.current)
    }

    /// Depth of the machine stack (0 once terminated).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_terminated(&self) -> bool {
        self.status == Status::Terminated
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Applies a `transition` instruction to the active frame.
    ///
    /// Returns a host-visible `error` instruction when the transition
    /// cannot be committed; the active machine has then been popped.
    fn commit_transition(
        &mut self,
        next_state: Option<StateName>,
        label: Option<String>,
        payload: Option<Payload>,
    ) -> Option<Instruction> {
        let mode = self.mode;
        let frame = self.stack.last_mut()?;
        let state = frame.current.clone();

        let target = if let Some(target) = next_state {
            // Direct target: the graph is consulted only for existence.
            if !frame.machine.contains(&target) {
                self.pop_machine();
                return Some(Instruction::error_with(
                    format!("state '{state}' requested transition to undeclared state '{target}'"),
                    json!({ "state": state.as_str(), "target": target.as_str() }),
                ));
            }
            target
        } else if mode == DispatchMode::GraphDriven {
            match dispatch_by_label(&frame.machine, &state, label.as_deref()) {
                Ok(target) => target,
                Err(error) => {
                    self.pop_machine();
                    return Some(error);
                }
            }
        } else {
            // A target-less transition is a routine bug outside
            // graph-driven mode.
            self.pop_machine();
            return Some(Instruction::error_with(
                format!("state '{state}' yielded a transition without a target"),
                json!({ "state": state.as_str() }),
            ));
        };

        trace!(from = %state, to = %target, "transition");
        frame.carry = if target.is_end() { None } else { payload };
        frame.current = target;
        frame.routine = None;
        None
    }

    /// Applies a `parent_transition`: pops the child machine and redirects
    /// the parent.
    fn commit_parent_transition(
        &mut self,
        target: StateName,
        payload: Option<Payload>,
    ) -> Option<Instruction> {
        let child = self.stack.pop()?;
        debug!(child = %child.current, target = %target, "parent transition");

        let Some(parent) = self.stack.last_mut() else {
            // Top-level parent transition halts the run with no terminal
            // notify.
            return None;
        };

        if !parent.machine.contains(&target) {
            let child_state = child.current;
            self.pop_machine();
            return Some(Instruction::error_with(
                format!(
                    "state '{child_state}' requested parent transition to undeclared state '{target}'"
                ),
                json!({ "state": child_state.as_str(), "target": target.as_str() }),
            ));
        }

        parent.carry = if target.is_end() { None } else { payload };
        parent.current = target;
        parent.routine = None;
        None
    }

    /// Pops the active machine. The new top frame, if any, is told its
    /// child returned so its sub-machine state counts as complete; an
    /// explicit parent redirection bypasses this (see
    /// [`Engine::commit_parent_transition`]).
    fn pop_machine(&mut self) -> Option<Frame> {
        let popped = self.stack.pop();
        if let Some(parent) = self.stack.last_mut() {
            parent.child_returned = true;
        }
        popped
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("depth", &self.stack.len())
            .field("current", &self.current_state())
            .field("mode", &self.mode)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// First-match guard dispatch for graph-driven transitions.
///
/// With a produced label: the first edge whose guard matches (trimmed
/// equality) wins. With no label: a single unguarded edge is taken
/// automatically; anything else refuses to guess.
fn dispatch_by_label(
    machine: &Machine,
    state: &StateName,
    label: Option<&str>,
) -> Result<StateName, Instruction> {
    let candidates = machine.successors(state);
    let produced = label.unwrap_or_default().trim();

    if produced.is_empty() {
        return match candidates {
            [] => Err(Instruction::error_with(
                format!("state '{state}' has no outgoing transitions to dispatch"),
                json!({ "state": state.as_str() }),
            )),
            [only] if only.guard.is_unconditional() => Ok(only.target.clone()),
            [_] => Err(Instruction::error_with(
                format!("state '{state}' produced no label but its only transition is guarded"),
                json!({ "state": state.as_str() }),
            )),
            _ => Err(Instruction::error_with(
                format!(
                    "state '{state}' produced no label but has {} outgoing transitions",
                    candidates.len()
                ),
                json!({ "state": state.as_str(), "candidates": candidates.len() }),
            )),
        };
    }

    candidates
        .iter()
        .find(|transition| transition.guard.matches(produced))
        .map(|transition| transition.target.clone())
        .ok_or_else(|| {
            Instruction::error_with(
                format!("no transition out of state '{state}' matches label '{produced}'"),
                json!({ "state": state.as_str(), "label": produced }),
            )
        })
}

/// Checks that every routine-classified state, including those of nested
/// sub-machines, has a factory.
fn validate_registry(
    machine: &Machine,
    scope: &mut Vec<StateName>,
    registry: &RoutineRegistry,
) -> Result<(), EngineError> {
    for state in machine.states() {
        match machine.classify(state) {
            Some(StateClass::Routine) => {
                if registry.resolve(scope, state).is_none() {
                    return Err(EngineError::UnregisteredRoutine {
                        state: RoutineRegistry::qualified_key(scope, state),
                    });
                }
            }
            Some(StateClass::SubMachine) => {
                if let Some(inner) = machine.sub_machine(state) {
                    scope.push(state.clone());
                    validate_registry(inner, scope, registry)?;
                    scope.pop();
                }
            }
            _ => {}
        }
    }
    Ok(())
}
