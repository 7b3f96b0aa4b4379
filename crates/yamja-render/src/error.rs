//! Error types for parsing, context building and rendering.
//!
//! Every failure in this crate is a [`RenderError`]. Errors are terminal: a
//! render either produces a complete tree or exactly one error describing the
//! first failure met in document order.

use thiserror::Error;

use crate::tree::{Location, NodeKind, Path};

/// The category of a [`RenderError`], for callers that map errors to exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    MergeConflict,
    UnresolvedVariable,
    TypeCoercion,
    TemplateTooDeep,
    Emit,
}

/// Error type for all rendering operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Malformed YAML, or a malformed expression inside a template scalar.
    #[error("parse error{}: {message}", at(.location))]
    Parse {
        message: String,
        location: Option<Location>,
    },

    /// Two models disagree on whether a path holds a mapping.
    #[error("merge conflict at '{path}': cannot merge {existing} with {incoming}")]
    MergeConflict {
        path: Path,
        existing: NodeKind,
        incoming: NodeKind,
    },

    /// An expression names a path absent from the context and has no default.
    #[error("unresolved variable '{path}'{}", at(.location))]
    UnresolvedVariable {
        path: Path,
        location: Option<Location>,
    },

    /// A sequence or mapping was interpolated into surrounding text.
    #[error("cannot interpolate {kind} value of '{path}' into text{}", at(.location))]
    TypeCoercion {
        path: Path,
        kind: NodeKind,
        location: Option<Location>,
    },

    /// The template nests deeper than the renderer allows.
    #[error("template nesting exceeds {limit} levels at '{path}'{}", at(.location))]
    TemplateTooDeep {
        limit: usize,
        path: Path,
        location: Option<Location>,
    },

    /// The serializer rejected a resolved tree.
    #[error("emit error: {0}")]
    Emit(String),
}

fn at(location: &Option<Location>) -> String {
    location
        .map(|loc| format!(" at {loc}"))
        .unwrap_or_default()
}

impl RenderError {
    /// Create a parse error without a location.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            location: None,
        }
    }

    /// Create a parse error at a source location.
    pub fn parse_at(message: impl Into<String>, location: Location) -> Self {
        Self::Parse {
            message: message.into(),
            location: Some(location),
        }
    }

    /// Fills in the location if the error does not carry one yet.
    pub fn located(mut self, at: Option<Location>) -> Self {
        match &mut self {
            RenderError::Parse { location, .. }
            | RenderError::UnresolvedVariable { location, .. }
            | RenderError::TypeCoercion { location, .. }
            | RenderError::TemplateTooDeep { location, .. } => {
                if location.is_none() {
                    *location = at;
                }
            }
            RenderError::MergeConflict { .. } | RenderError::Emit(_) => {}
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::Parse { .. } => ErrorKind::Parse,
            RenderError::MergeConflict { .. } => ErrorKind::MergeConflict,
            RenderError::UnresolvedVariable { .. } => ErrorKind::UnresolvedVariable,
            RenderError::TypeCoercion { .. } => ErrorKind::TypeCoercion,
            RenderError::TemplateTooDeep { .. } => ErrorKind::TemplateTooDeep,
            RenderError::Emit(_) => ErrorKind::Emit,
        }
    }

    /// The source location, when the error carries one.
    pub fn location(&self) -> Option<Location> {
        match self {
            RenderError::Parse { location, .. }
            | RenderError::UnresolvedVariable { location, .. }
            | RenderError::TypeCoercion { location, .. }
            | RenderError::TemplateTooDeep { location, .. } => *location,
            RenderError::MergeConflict { .. } | RenderError::Emit(_) => None,
        }
    }
}

impl From<serde_yaml::Error> for RenderError {
    fn from(err: serde_yaml::Error) -> Self {
        RenderError::Emit(err.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Emit(err.to_string())
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
