use super::models::{Credential, SignCountUpdate, User};
use std::sync::Arc;
use uuid::Uuid;

/// Failures reported by a [`UserDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("credential already registered for this user")]
    DuplicateCredential,

    #[error("credential not found for this user")]
    CredentialNotFound,
}

/// Abstraction for user and credential storage.
///
/// Implementations must make `get_or_create` linearizable per name and
/// `update_sign_count` an atomic compare-and-update per credential.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    // ---
    /// Get the user registered under `name`, creating it on first sight.
    async fn get_or_create(&self, name: &str) -> Result<User, DirectoryError>;

    /// Get user by ID.
    async fn get_by_id(&self, user_id: Uuid) -> Result<User, DirectoryError>;

    /// Attach a new credential to a user.
    async fn add_credential(&self, user_id: Uuid, credential: Credential) -> Result<(), DirectoryError>;

    /// Record the counter reported by a successful assertion.
    ///
    /// A counter that did not strictly advance (unless stored and reported
    /// are both zero), or an `authenticator_warning` from the engine, is
    /// returned as a clone warning. The stored counter never decreases.
    /// `last_used_at` is stamped only when no warning is raised.
    async fn update_sign_count(
        &self,
        user_id: Uuid,
        credential_id: &[u8],
        new_count: u32,
        authenticator_warning: bool,
    ) -> Result<SignCountUpdate, DirectoryError>;

    /// Stamp `last_used_at` for a warned assertion the clone policy let through.
    async fn record_use(&self, user_id: Uuid, credential_id: &[u8]) -> Result<(), DirectoryError>;
}

/// Type alias for any backend that implements UserDirectory.
pub type DirectoryPtr = Arc<dyn UserDirectory>;
