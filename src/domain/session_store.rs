use super::models::{NewSession, Session};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Failures reported by a [`SessionStore`] on consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,

    #[error("session expired")]
    Expired,
}

/// Abstraction for in-flight ceremony state.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    // ---
    /// Store a new session under a freshly generated token and return the token.
    async fn create(&self, session: NewSession) -> String;

    /// Atomically remove and return the session for `token`.
    ///
    /// A token is returned as valid at most once. Sessions older than the
    /// ceremony window come back as [`SessionError::Expired`].
    async fn consume(&self, token: &str) -> Result<Session, SessionError>;

    /// Drop every expired session, returning how many were removed.
    async fn sweep_expired(&self) -> usize;

    /// Number of sessions currently outstanding.
    async fn pending(&self) -> usize;
}

/// Type alias for any backend that implements SessionStore.
pub type SessionStorePtr = Arc<dyn SessionStore>;

/// Time source for session expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type ClockPtr = Arc<dyn Clock>;
