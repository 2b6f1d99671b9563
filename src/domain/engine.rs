//! Ceremony engine abstraction.
//!
//! The engine owns the cryptography: it produces the options a client needs
//! to run a ceremony, plus an opaque state blob that is kept in the session
//! store until the matching finish step hands it back for verification.

use super::models::User;
use std::sync::Arc;

/// Failures reported by a [`CeremonyEngine`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The client response did not verify (bad signature, wrong challenge,
    /// unknown credential, malformed payload).
    #[error("verification failed: {0}")]
    Verification(String),

    /// The engine itself could not operate (configuration, corrupt state).
    #[error("engine failure: {0}")]
    Internal(String),
}

/// Options for the client and the state needed to verify its answer.
#[derive(Debug, Clone)]
pub struct CeremonyChallenge {
    // ---
    pub options: serde_json::Value,
    pub state: Vec<u8>,
}

/// A credential produced by a verified registration response.
#[derive(Debug, Clone)]
pub struct VerifiedCredential {
    // ---
    pub id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub sign_count: u32,
    pub transports: Vec<String>,
}

/// The result of a verified login assertion.
#[derive(Debug, Clone)]
pub struct VerifiedAssertion {
    // ---
    pub credential_id: Vec<u8>,
    pub sign_count: u32,

    /// Set when the engine itself suspects a cloned authenticator
    pub clone_warning: bool,
}

/// Cryptographic half of the registration and login ceremonies.
pub trait CeremonyEngine: Send + Sync {
    // ---
    /// Registration options for `user`, excluding credentials it already has.
    fn begin_registration(&self, user: &User) -> Result<CeremonyChallenge, EngineError>;

    /// Verify an attestation response against the state from `begin_registration`.
    fn finish_registration(
        &self,
        user: &User,
        state: &[u8],
        response: &serde_json::Value,
    ) -> Result<VerifiedCredential, EngineError>;

    /// Login options scoped to the user's credentials.
    ///
    /// Must succeed for a user with no credentials, producing options that
    /// look like any other login (with an empty allow list).
    fn begin_login(&self, user: &User) -> Result<CeremonyChallenge, EngineError>;

    /// Verify an assertion response against the state from `begin_login`.
    fn finish_login(
        &self,
        user: &User,
        state: &[u8],
        response: &serde_json::Value,
    ) -> Result<VerifiedAssertion, EngineError>;
}

pub type EnginePtr = Arc<dyn CeremonyEngine>;
