//! Board-level error type.

use thiserror::Error;

/// Errors returned by a [`BoardService`](crate::BoardService) call.
///
/// The engine records the message on the failed action; none of the
/// variants are retried by the engine itself.
/// - `NotFound`: the referenced card / list / label / member does not exist.
/// - `Rejected`: the board refused the mutation (validation, permissions).
/// - `Unavailable`: transport failure or a 5xx from the board application.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("board rejected the request: {0}")]
    Rejected(String),

    #[error("board service unavailable: {0}")]
    Unavailable(String),
}

impl BoardError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
