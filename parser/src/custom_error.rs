//! Contextual parse errors for the nom-based module parser
//!
//! Tracks the remaining input at the failure point plus the stack of
//! `context()` messages pushed while unwinding, so the caller can report the
//! deepest failure with a useful description.

use nom::error::{ContextError, ErrorKind, ParseError};

/// Error type that captures context strings attached via `nom::error::context`
#[derive(Debug, Clone, PartialEq)]
pub struct ContextualError<I> {
    /// Remaining input at the point of failure
    pub input: I,
    /// Context messages, innermost first
    pub contexts: Vec<&'static str>,
}

impl<I> ContextualError<I> {
    pub fn new(input: I) -> Self {
        Self { input, contexts: Vec::new() }
    }

    pub fn with_context(input: I, context: &'static str) -> Self {
        Self { input, contexts: vec![context] }
    }

    /// The innermost context message, if any
    pub fn message(&self) -> Option<&'static str> {
        self.contexts.first().copied()
    }
}

impl<I> ParseError<I> for ContextualError<I> {
    fn from_error_kind(input: I, _kind: ErrorKind) -> Self {
        Self::new(input)
    }

    fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<I> ContextError<I> for ContextualError<I> {
    fn add_context(_input: I, context: &'static str, mut other: Self) -> Self {
        other.contexts.push(context);
        other
    }
}
