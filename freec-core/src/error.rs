//! Compiler diagnostics.
//!
//! Every fallible pass returns [`Result`]. Errors carry a message and, when the
//! offending declaration is known, its source span. The `err_*!` macros build an
//! error value, the `bail_*!` macros return it from the enclosing function.

use crate::ast::Span;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompilerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilerError {
    /// No single structurally decreasing parameter could be identified.
    #[error("{}decreasing argument error: {}", location(.1), .0)]
    DecreasingArgument(String, Option<Span>),

    /// Type synonyms that depend on each other.
    #[error("{}type synonym cycle: {}", location(.1), .0)]
    TypeSynonymCycle(String, Option<Span>),

    /// Inlining met a reference it could not resolve. Never caused by well-formed input.
    #[error("{}internal error: unresolved reference during inlining: {}", location(.1), .0)]
    UnresolvedReference(String, Option<Span>),

    /// A pragma refers to an unknown function or parameter.
    #[error("{}invalid pragma: {}", location(.1), .0)]
    Pragma(String, Option<Span>),
}

impl CompilerError {
    pub fn message(&self) -> &str {
        match self {
            CompilerError::DecreasingArgument(msg, _)
            | CompilerError::TypeSynonymCycle(msg, _)
            | CompilerError::UnresolvedReference(msg, _)
            | CompilerError::Pragma(msg, _) => msg,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            CompilerError::DecreasingArgument(_, span)
            | CompilerError::TypeSynonymCycle(_, span)
            | CompilerError::UnresolvedReference(_, span)
            | CompilerError::Pragma(_, span) => *span,
        }
    }

    /// Attach a span if the error does not have one yet.
    pub fn with_span(self, span: Span) -> Self {
        match self {
            CompilerError::DecreasingArgument(msg, None) => CompilerError::DecreasingArgument(msg, Some(span)),
            CompilerError::TypeSynonymCycle(msg, None) => CompilerError::TypeSynonymCycle(msg, Some(span)),
            CompilerError::UnresolvedReference(msg, None) => {
                CompilerError::UnresolvedReference(msg, Some(span))
            }
            CompilerError::Pragma(msg, None) => CompilerError::Pragma(msg, Some(span)),
            other => other,
        }
    }
}

fn location(span: &Option<Span>) -> String {
    match span {
        Some(span) if !span.is_generated() => format!("{}: ", span),
        _ => String::new(),
    }
}

// =============================================================================
// Construction macros
// =============================================================================

#[macro_export]
macro_rules! err_dec_arg {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::DecreasingArgument(format!($($arg)*), None)
    };
}

#[macro_export]
macro_rules! err_dec_arg_at {
    ($span:expr, $($arg:tt)*) => {
        $crate::error::CompilerError::DecreasingArgument(format!($($arg)*), Some($span))
    };
}

#[macro_export]
macro_rules! bail_dec_arg_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::err_dec_arg_at!($span, $($arg)*))
    };
}

#[macro_export]
macro_rules! err_type_cycle_at {
    ($span:expr, $($arg:tt)*) => {
        $crate::error::CompilerError::TypeSynonymCycle(format!($($arg)*), Some($span))
    };
}

#[macro_export]
macro_rules! bail_type_cycle_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::err_type_cycle_at!($span, $($arg)*))
    };
}

#[macro_export]
macro_rules! err_unresolved {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::UnresolvedReference(format!($($arg)*), None)
    };
}

#[macro_export]
macro_rules! bail_unresolved {
    ($($arg:tt)*) => {
        return Err($crate::err_unresolved!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_pragma_at {
    ($span:expr, $($arg:tt)*) => {
        $crate::error::CompilerError::Pragma(format!($($arg)*), Some($span))
    };
}

#[macro_export]
macro_rules! bail_pragma_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::err_pragma_at!($span, $($arg)*))
    };
}
