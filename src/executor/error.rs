//! Error types raised by the shadow interpreter.
//!
//! Expected runtime violations of the program under analysis (null receivers,
//! out-of-bounds indices, zero divisors) are never reported through these
//! types: they become constraints. Everything here stops tracking for the
//! current execution.

use thiserror::Error;

use crate::executor::symbolic_value::Comparator;

/// Failures while manipulating the operand stack, the locals table or the frame stack.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StackError {
    #[error("operand stack underflow: needed {needed} slots, have {have}")]
    Underflow { needed: usize, have: usize },

    #[error("operand kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot split a double-word operand while taking {0} slots")]
    SplitDoubleWord(usize),

    #[error("local slot {0} is empty")]
    MissingLocal(usize),

    #[error("local slot {index} out of range (max locals {max})")]
    LocalOutOfRange { index: usize, max: usize },

    #[error("frame stack is empty")]
    NoFrame,

    #[error("no caller frame below the current frame")]
    NoCallerFrame,

    #[error("cannot pop the bottom frame")]
    BottomFrame,
}

/// Failures while resolving a described type or member against the loaded type information.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("cannot resolve field `{owner}.{name}`")]
    UnknownField { owner: String, name: String },

    #[error("cannot resolve method `{owner}.{name}{descriptor}`")]
    UnknownMethod {
        owner: String,
        name: String,
        descriptor: String,
    },

    #[error("cannot resolve constructor `{owner}.<init>{descriptor}`")]
    UnknownConstructor { owner: String, descriptor: String },

    #[error("malformed descriptor `{0}`")]
    MalformedDescriptor(String),
}

/// Failures of the constraint normalizer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NormalizationError {
    #[error("no relational operator for `cmp(a, b) {comparator} {literal}`")]
    Unsupported { comparator: Comparator, literal: i64 },
}

/// Umbrella error of a single callback.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("unexpected expression kind: expected {expected}, found `{found}`")]
    ExpressionKind {
        expected: &'static str,
        found: String,
    },

    #[error("callback out of protocol: {0}")]
    Protocol(String),
}

impl ExecutionError {
    /// Whether the error comes from missing or inconsistent type information.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, ExecutionError::Resolution(_))
    }

    /// Whether the error is a broken internal contract (stack discipline,
    /// normalizer table, expression kinds).
    pub fn is_internal(&self) -> bool {
        !self.is_resolution_failure()
    }
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;
