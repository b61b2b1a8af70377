//! # weft-types: Core types for `Weft`
//!
//! This crate contains the shared vocabulary used across the `Weft` system:
//! - State identity ([`StateName`]) and the reserved entry/exit names
//! - Transition guards ([`GuardLabel`])
//! - State classification ([`StateClass`])
//! - Opaque payloads carried across transitions ([`Payload`])

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Opaque value attached to transitions and instructions.
///
/// The engine never inspects a payload; it is produced by one routine and
/// delivered verbatim to the next (or to the host).
pub type Payload = serde_json::Value;

// ============================================================================
// State Names
// ============================================================================

/// Name of a state within a machine.
///
/// Two names are reserved: every machine starts at [`StateName::START`] and
/// terminates at [`StateName::END`]. All other names are free-form non-empty
/// strings (emptiness is rejected at graph construction).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateName(String);

impl StateName {
    /// The initial state of every machine.
    pub const START: &'static str = "__start__";

    /// The terminal state of every machine.
    pub const END: &'static str = "__end__";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the `__start__` name.
    pub fn start() -> Self {
        Self(Self::START.to_string())
    }

    /// Returns the `__end__` name.
    pub fn end() -> Self {
        Self(Self::END.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_start(&self) -> bool {
        self.0 == Self::START
    }

    pub fn is_end(&self) -> bool {
        self.0 == Self::END
    }

    /// True for `__start__` and `__end__`.
    pub fn is_reserved(&self) -> bool {
        self.is_start() || self.is_end()
    }
}

impl Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StateName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for StateName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<StateName> for String {
    fn from(name: StateName) -> Self {
        name.0
    }
}

// ============================================================================
// Guard Labels
// ============================================================================

/// Guard attached to a transition, matched against a routine-produced label.
///
/// Matching is exact string equality after trimming both sides. The empty
/// (or all-whitespace) label is unconditional: it matches only the empty
/// produced label, and an edge carrying it is taken without a guard check
/// when it is the sole candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuardLabel(String);

impl GuardLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The unconditional (empty) guard.
    pub fn unconditional() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this guard places no condition on the transition.
    pub fn is_unconditional(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Exact equality after trimming both sides.
    pub fn matches(&self, produced: &str) -> bool {
        self.0.trim() == produced.trim()
    }
}

impl Display for GuardLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GuardLabel {
    fn from(label: String) -> Self {
        Self(label)
    }
}

impl From<&str> for GuardLabel {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

// ============================================================================
// State Classification
// ============================================================================

/// What a state name resolves to within its machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateClass {
    /// The state is bound to a routine.
    Routine,
    /// The state is a nested machine, pushed on entry.
    SubMachine,
    /// The state is `__end__`; the engine never advances it.
    Terminal,
}
