use thiserror::Error;

use super::state::SessionStatus;

/// Errors raised by the session lifecycle itself. `InvalidTransition` is a
/// caller sequencing bug; `InvalidInput` is user-facing validation that the
/// embedding UI surfaces on the finalize form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {operation} a session that is {status}")]
    InvalidTransition {
        operation: &'static str,
        status: SessionStatus,
    },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: &'static str },
}

impl SessionError {
    pub(crate) fn invalid_transition(operation: &'static str, status: SessionStatus) -> Self {
        SessionError::InvalidTransition { operation, status }
    }
}
