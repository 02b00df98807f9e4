//! Typed errors for the parser and substitution boundary.
//!
//! Domain errors (division by zero, a custom callback producing NaN/Inf)
//! are *not* represented here — they propagate as ordinary `f64` values
//! and never raise.

use thiserror::Error;

/// Failure modes the public API can report. Parsing never leaves a
/// partially-built graph behind on an `Err` path — every constructor
/// called while parsing is matched by a `discard` before the error
/// bubbles up.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RadError {
    /// The input ended while a value or operator was still expected.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// A token wasn't a valid start of a value (number, `[`, `{`, `(`).
    #[error("unexpected character {found:?} at byte offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    /// A numeric literal failed the platform decimal-string conversion.
    #[error("malformed number at byte offset {offset}")]
    MalformedNumber { offset: usize },

    /// A `(` was never matched by a closing `)`, or a stray `)` appeared.
    #[error("unbalanced parentheses at byte offset {offset}")]
    UnbalancedParens { offset: usize },

    /// A `[` or `{` block wasn't closed by the matching bracket.
    #[error("unbalanced brackets at byte offset {offset}")]
    UnbalancedBrackets { offset: usize },

    /// A character appeared where `+ - * /` was expected.
    #[error("unknown operator {found:?} at byte offset {offset}")]
    UnknownOperator { found: char, offset: usize },

    /// The parsed expression references `{arg_id}` but `parse` wasn't
    /// given a substitute for it.
    #[error("no substitute supplied for argument placeholder {{{arg_id}}}")]
    MissingSubstitution { arg_id: usize },
}

/// Convenience alias used throughout the crate's fallible public API.
pub type Result<T> = std::result::Result<T, RadError>;
