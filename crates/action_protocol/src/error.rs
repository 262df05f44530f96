use std::ops::Range;

use serde::Serialize;
use thiserror::Error;

use crate::path::PathError;

/// Why one directive could not be turned into a token.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ParseErrorKind {
    #[error("unrecognized directive kind '{kind}'")]
    UnknownKind { kind: String },

    #[error("directive has no 'type' attribute")]
    MissingKind,

    #[error("{kind} directive has no usable path")]
    MissingPath { kind: String },

    #[error("malformed attribute: {detail}")]
    MalformedAttribute { detail: String },

    #[error("path '{path}' escapes the project root")]
    PathEscape { path: String },

    #[error("start marker is not terminated by '>'")]
    TruncatedMarker,
}

impl ParseErrorKind {
    /// Maps a path normalization failure for a directive of `kind`.
    #[must_use]
    pub fn from_path_error(kind: &str, error: PathError) -> Self {
        match error {
            PathError::Empty => Self::MissingPath {
                kind: kind.to_string(),
            },
            PathError::Escape { path } | PathError::Absolute { path } => Self::PathEscape { path },
        }
    }
}

/// A directive-local parse failure; the scan continues past it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("directive #{sequence} at bytes {}..{}: {kind}", .span.start, .span.end)]
pub struct ParseError {
    pub sequence: usize,
    #[serde(skip)]
    pub span: Range<usize>,
    #[serde(flatten)]
    pub kind: ParseErrorKind,
}

impl ParseError {
    #[must_use]
    pub fn new(sequence: usize, span: Range<usize>, kind: ParseErrorKind) -> Self {
        Self {
            sequence,
            span,
            kind,
        }
    }
}
