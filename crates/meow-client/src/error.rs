use thiserror::Error;

use meow_types::api::{ErrorBody, ErrorKind};

pub type Result<T> = std::result::Result<T, ClientError>;

/// Failure of a backend call, classified so callers can tell a dead network
/// apart from a missing record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Backend unreachable: {0}")]
    NetworkUnavailable(String),

    #[error("Unexpected backend error: {0}")]
    Unknown(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NotFound(_) => ErrorKind::NotFound,
            ClientError::Conflict(_) => ErrorKind::Conflict,
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
            ClientError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Transient connectivity failure. Sessions survive these.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::NetworkUnavailable(_))
    }

    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::NotFound => ClientError::NotFound(message),
            ErrorKind::Conflict => ClientError::Conflict(message),
            ErrorKind::Validation => ClientError::Validation(message),
            ErrorKind::NetworkUnavailable => ClientError::NetworkUnavailable(message),
            ErrorKind::Unknown => ClientError::Unknown(message),
        }
    }
}

impl From<ErrorBody> for ClientError {
    fn from(body: ErrorBody) -> Self {
        ClientError::from_kind(body.kind, body.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips() {
        for kind in [
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::Validation,
            ErrorKind::NetworkUnavailable,
            ErrorKind::Unknown,
        ] {
            assert_eq!(ClientError::from_kind(kind, "x").kind(), kind);
        }
        assert!(ClientError::NetworkUnavailable("down".into()).is_network());
        assert!(!ClientError::NotFound("user".into()).is_network());
    }
}
