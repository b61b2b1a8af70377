//! The instruction protocol.
//!
//! Instructions are produced by routines and classified by the engine:
//! `transition` and `parent_transition` mutate engine state and are
//! consumed internally; everything else is delivered to the host verbatim,
//! in production order.

use serde::{Deserialize, Serialize};
use weft_types::{Payload, StateName};

/// A tagged record yielded by a state routine.
///
/// The serialized form uses `instruction` as the tag field and the wire
/// field names of the host protocol (`next_state`, `query`, `message`,
/// ...). Hosts must tolerate unknown fields and must not rely on field
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "instruction", rename_all = "snake_case")]
pub enum Instruction {
    /// Transition to another state of the current machine.
    ///
    /// Routine-driven transitions name their target in `next_state`.
    /// Graph-driven transitions omit it and carry the produced guard
    /// label instead (no label means the unconditional label).
    Transition {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next_state: Option<StateName>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Payload>,
    },

    /// Pop the current sub-machine; continue in the parent at the named
    /// state. An optional payload becomes the parent state's carry, the
    /// same way a plain transition carries one.
    ParentTransition {
        next_state_for_parent: StateName,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Payload>,
    },

    /// Ask the host to solicit a value; the routine is resumed with the
    /// host's reply.
    RequestInput { query: String },

    /// Informational message.
    Notify {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Payload>,
    },

    /// Non-fatal anomaly.
    Warning {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Payload>,
    },

    /// Routine-level failure report; does not terminate the routine by
    /// itself.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Payload>,
    },

    /// Diagnostic trace; hosts may suppress it outside debug mode.
    Debug {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Payload>,
    },

    /// Named side effect with an arbitrary payload.
    Custom {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Payload>,
    },
}

impl Instruction {
    /// Transition to `next_state` with no payload.
    pub fn transition(next_state: impl Into<StateName>) -> Self {
        Self::Transition {
            next_state: Some(next_state.into()),
            label: None,
            payload: None,
        }
    }

    /// Transition to `next_state` carrying a payload.
    pub fn transition_with(next_state: impl Into<StateName>, payload: Payload) -> Self {
        Self::Transition {
            next_state: Some(next_state.into()),
            label: None,
            payload: Some(payload),
        }
    }

    /// Graph-driven transition: produce a label for guard matching.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self::Transition {
            next_state: None,
            label: Some(label.into()),
            payload: None,
        }
    }

    /// Graph-driven transition with no label (unconditional dispatch).
    pub fn unlabeled() -> Self {
        Self::Transition {
            next_state: None,
            label: None,
            payload: None,
        }
    }

    /// Pop the current sub-machine and continue in the parent.
    pub fn parent_transition(next_state_for_parent: impl Into<StateName>) -> Self {
        Self::ParentTransition {
            next_state_for_parent: next_state_for_parent.into(),
            payload: None,
        }
    }

    /// Pop the current sub-machine, continuing in the parent with a carry
    /// payload.
    pub fn parent_transition_with(
        next_state_for_parent: impl Into<StateName>,
        payload: Payload,
    ) -> Self {
        Self::ParentTransition {
            next_state_for_parent: next_state_for_parent.into(),
            payload: Some(payload),
        }
    }

    /// Ask the host for a value.
    pub fn request_input(query: impl Into<String>) -> Self {
        Self::RequestInput {
            query: query.into(),
        }
    }

    /// Informational notification at the default level.
    pub fn notify(message: impl Into<String>) -> Self {
        Self::Notify {
            message: message.into(),
            level: None,
            payload: None,
        }
    }

    /// Informational notification with an explicit level.
    pub fn notify_level(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Notify {
            message: message.into(),
            level: Some(level.into()),
            payload: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            payload: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            payload: None,
        }
    }

    pub fn error_with(message: impl Into<String>, payload: Payload) -> Self {
        Self::Error {
            message: message.into(),
            payload: Some(payload),
        }
    }

    pub fn debug(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Debug {
            message: message.into(),
            level: Some(level.into()),
            payload: None,
        }
    }

    pub fn custom(name: impl Into<String>, payload: Payload) -> Self {
        Self::Custom {
            name: name.into(),
            payload: Some(payload),
        }
    }

    /// True for instructions the engine forwards to the host.
    pub fn is_host_directed(&self) -> bool {
        !self.is_engine_internal()
    }

    /// True for `transition` and `parent_transition`, which never reach
    /// the host.
    pub fn is_engine_internal(&self) -> bool {
        matches!(
            self,
            Self::Transition { .. } | Self::ParentTransition { .. }
        )
    }

    /// True when the host must answer with [`crate::Engine::reply`].
    pub fn expects_reply(&self) -> bool {
        matches!(self, Self::RequestInput { .. })
    }
}
