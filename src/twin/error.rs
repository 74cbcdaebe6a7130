//! Errors raised while transforming a stream.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TwinError {
    /// Reading the input or writing the output failed, a closed output pipe
    /// included.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A line inside a flipped block has fewer than three tokens.
    #[error("line {line_number}: expected at least 3 index tokens, found {tokens}: {content:?}")]
    ShortLine {
        line_number: usize,
        content: String,
        tokens: usize,
    },

    /// Strict parsing met an index token that is not an integer.
    #[error("line {line_number}: index token {token:?} is not an integer: {content:?}")]
    MalformedIndex {
        line_number: usize,
        token: String,
        content: String,
    },

    #[error("{which} marker must not be empty")]
    EmptyMarker { which: &'static str },
}

impl TwinError {
    /// The 1-based input line the error refers to, if any.
    pub fn line_number(&self) -> Option<usize> {
        match self {
            TwinError::ShortLine { line_number, .. }
            | TwinError::MalformedIndex { line_number, .. } => Some(*line_number),
            TwinError::Io(_) | TwinError::EmptyMarker { .. } => None,
        }
    }
}
