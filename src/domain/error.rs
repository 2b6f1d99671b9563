use super::models::CloneWarning;
use uuid::Uuid;

/// Errors returned by the ceremony operations.
///
/// Every failure is terminal for the ceremony: the client must start over
/// with a fresh `begin_*` call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CeremonyError {
    #[error("username must not be empty")]
    InvalidUsername,

    /// Token absent, expired, already consumed, or begun for the other ceremony.
    #[error("ceremony session not found or expired")]
    InvalidSession,

    /// The session points at a user the directory no longer knows.
    #[error("user {0} referenced by session does not exist")]
    UnknownUser(Uuid),

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("credential already registered")]
    DuplicateCredential,

    /// Raised instead of a successful login when the clone policy denies.
    #[error("possible cloned authenticator: {0}")]
    CloneDetected(CloneWarning),

    #[error("ceremony engine failure: {0}")]
    Engine(String),
}

impl CeremonyError {
    // ---
    /// True when the failure was caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        // ---
        !matches!(self, CeremonyError::UnknownUser(_) | CeremonyError::Engine(_))
    }
}
