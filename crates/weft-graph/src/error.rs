//! Graph construction and parse errors.

use weft_types::StateName;

/// Errors raised while building or parsing a machine description.
///
/// All of these are construction-time failures; a successfully built
/// [`super::Machine`](crate::Machine) never fails at query time.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("machine must declare a '{}' state", StateName::START)]
    MissingStart,

    #[error("machine must declare a '{}' state", StateName::END)]
    MissingEnd,

    #[error("state names must be non-empty")]
    EmptyStateName,

    #[error("state '{0}' declared more than once")]
    DuplicateState(StateName),

    #[error("reserved state '{0}' cannot be a sub-machine")]
    ReservedSubMachine(StateName),

    #[error("transition {src} -> {target} references undeclared source")]
    UnknownTransitionSource {
        src: StateName,
        target: StateName,
    },

    #[error("transition {src} -> {target} references undeclared target")]
    UnknownTransitionTarget {
        src: StateName,
        target: StateName,
    },

    // Parse errors
    #[error("graph description is empty")]
    EmptyGraph,

    #[error("unbalanced double quote in graph description")]
    UnbalancedQuote,

    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
}
