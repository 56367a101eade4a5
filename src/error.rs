use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a ledger call can be rejected. Every variant carries the message
/// surfaced to the external caller; a rejected call never leaves partial state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Error {
    /// Malformed or out-of-range arguments.
    #[error("Validation error: {0}")]
    Validation(String),
    /// The caller lacks the role the operation requires.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The operation is illegal in the entity's current state.
    #[error("Invalid state: {0}")]
    State(String),
    /// A confirmation or majority threshold was not met, or would be broken.
    #[error("Quorum error: {0}")]
    Quorum(String),
    /// The referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// The class of an [`Error`], without its message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    State,
    Quorum,
    NotFound,
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub fn quorum(msg: impl Into<String>) -> Self {
        Self::Quorum(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::State(_) => ErrorKind::State,
            Self::Quorum(_) => ErrorKind::Quorum,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// The reason string, without the class prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::State(msg)
            | Self::Quorum(msg)
            | Self::NotFound(msg) => msg,
        }
    }

    /// The HTTP status a fronting API should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 403,
            Self::NotFound(_) => 404,
            Self::State(_) => 409,
            Self::Quorum(_) => 422,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_status_codes() {
        let err = Error::state("Already voted for this position");
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.reason(), "Already voted for this position");
        assert_eq!(
            err.to_string(),
            "Invalid state: Already voted for this position"
        );

        assert_eq!(Error::validation("x").status_code(), 400);
        assert_eq!(Error::unauthorized("x").status_code(), 403);
        assert_eq!(Error::not_found("x").status_code(), 404);
        assert_eq!(Error::quorum("x").kind(), ErrorKind::Quorum);
    }
}
