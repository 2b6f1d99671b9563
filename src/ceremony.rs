//! Ceremony orchestration.
//!
//! Implements the two-phase passkey flows on top of the directory, the
//! session store and the ceremony engine:
//! 1. `begin_registration` / `finish_registration` - enroll a new credential
//! 2. `begin_login` / `finish_login` - assert a credential, with clone detection
//!
//! The service keeps no state of its own between calls. Everything a finish
//! step needs travels through the session store under the token handed out
//! by the matching begin step.

use crate::domain::{
    CeremonyError, CeremonyKind, CeremonyStart, ClonePolicy, Credential, DirectoryError,
    DirectoryPtr, EngineError, EnginePtr, LoginOutcome, MetricsPtr, NewSession,
    RegistrationOutcome, Session, SessionError, SessionStorePtr, User,
};
use std::sync::Arc;

/// Shared handle to the ceremony service.
pub type CeremonyServicePtr = Arc<CeremonyService>;

/// Orchestrates registration and login ceremonies.
pub struct CeremonyService {
    // ---
    directory: DirectoryPtr,
    sessions: SessionStorePtr,
    engine: EnginePtr,
    metrics: MetricsPtr,
    clone_policy: ClonePolicy,
}

impl CeremonyService {
    // ---
    pub fn new(
        directory: DirectoryPtr,
        sessions: SessionStorePtr,
        engine: EnginePtr,
        metrics: MetricsPtr,
        clone_policy: ClonePolicy,
    ) -> Self {
        // ---
        Self {
            directory,
            sessions,
            engine,
            metrics,
            clone_policy,
        }
    }

    pub fn clone_policy(&self) -> ClonePolicy {
        self.clone_policy
    }

    /// Get a reference to the session store.
    pub fn sessions(&self) -> &SessionStorePtr {
        &self.sessions
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Starts registration for `username`, creating the user on first sight.
    ///
    /// # Errors
    /// - `InvalidUsername` for an empty or blank name
    /// - `Engine` if the engine cannot produce options
    #[tracing::instrument(skip(self))]
    pub async fn begin_registration(&self, username: &str) -> Result<CeremonyStart, CeremonyError> {
        // ---
        let kind = CeremonyKind::Registration;
        let result = self.try_begin_registration(username).await;
        self.record_start(kind, &result);
        result
    }

    async fn try_begin_registration(&self, username: &str) -> Result<CeremonyStart, CeremonyError> {
        // ---
        let username = validate_username(username)?;
        let user = self.directory.get_or_create(username).await.map_err(map_directory)?;

        let challenge = self.engine.begin_registration(&user).map_err(|e| {
            tracing::error!("Failed to start registration for user '{}': {}", username, e);
            map_engine(e)
        })?;

        let token = self
            .sessions
            .create(NewSession::registration(user.id, challenge.state))
            .await;

        tracing::info!("Registration started for user: {}", username);

        Ok(CeremonyStart {
            options: challenge.options,
            token,
        })
    }

    /// Completes registration by verifying the attestation and storing the credential.
    ///
    /// # Errors
    /// `InvalidSession`, `UnknownUser`, `VerificationFailed`,
    /// `DuplicateCredential` or `Engine`; the ceremony is over either way.
    #[tracing::instrument(skip(self, token, response))]
    pub async fn finish_registration(
        &self,
        token: &str,
        response: &serde_json::Value,
    ) -> Result<RegistrationOutcome, CeremonyError> {
        // ---
        let kind = CeremonyKind::Registration;
        let result = self.try_finish_registration(token, response).await;
        self.record_finish(kind, &result);
        result
    }

    async fn try_finish_registration(
        &self,
        token: &str,
        response: &serde_json::Value,
    ) -> Result<RegistrationOutcome, CeremonyError> {
        // ---
        let session = self.take_session(token, CeremonyKind::Registration).await?;
        let user = self.session_user(&session).await?;

        let verified = self
            .engine
            .finish_registration(&user, &session.challenge, response)
            .map_err(|e| {
                tracing::warn!("Credential verification failed for user '{}': {}", user.name, e);
                map_engine(e)
            })?;

        let credential_id = verified.id.clone();
        let credential = Credential::new(
            verified.id,
            verified.public_key,
            verified.sign_count,
            verified.transports,
        );

        self.directory
            .add_credential(user.id, credential)
            .await
            .map_err(map_directory)?;

        tracing::info!(
            "Registration completed for user: {} (credential: {})",
            user.name,
            hex::encode(&credential_id)
        );

        Ok(RegistrationOutcome {
            user_id: user.id,
            credential_id,
        })
    }

    // ========================================================================
    // Login
    // ========================================================================

    /// Starts login for `username`.
    ///
    /// Unknown names are not rejected: the user is created with no
    /// credentials and receives ordinary-looking options, so callers cannot
    /// tell an unregistered name from a registered one.
    #[tracing::instrument(skip(self))]
    pub async fn begin_login(&self, username: &str) -> Result<CeremonyStart, CeremonyError> {
        // ---
        let kind = CeremonyKind::Login;
        let result = self.try_begin_login(username).await;
        self.record_start(kind, &result);
        result
    }

    async fn try_begin_login(&self, username: &str) -> Result<CeremonyStart, CeremonyError> {
        // ---
        let username = validate_username(username)?;
        let user = self.directory.get_or_create(username).await.map_err(map_directory)?;

        let challenge = self.engine.begin_login(&user).map_err(|e| {
            tracing::error!("Failed to generate auth challenge for user '{}': {}", username, e);
            map_engine(e)
        })?;

        if user.credentials.is_empty() {
            tracing::debug!("User '{}' has no registered credentials", username);
        }

        let token = self
            .sessions
            .create(NewSession::login(user.id, challenge.state, user.credential_ids()))
            .await;

        tracing::info!("Generated auth challenge for user: {}", username);

        Ok(CeremonyStart {
            options: challenge.options,
            token,
        })
    }

    /// Completes login by verifying the assertion and advancing the sign count.
    ///
    /// A clone warning either rides along on the outcome (`ClonePolicy::Warn`)
    /// or turns the login into `CloneDetected` (`ClonePolicy::Deny`).
    #[tracing::instrument(skip(self, token, response))]
    pub async fn finish_login(
        &self,
        token: &str,
        response: &serde_json::Value,
    ) -> Result<LoginOutcome, CeremonyError> {
        // ---
        let kind = CeremonyKind::Login;
        let result = self.try_finish_login(token, response).await;
        self.record_finish(kind, &result);
        result
    }

    async fn try_finish_login(
        &self,
        token: &str,
        response: &serde_json::Value,
    ) -> Result<LoginOutcome, CeremonyError> {
        // ---
        let session = self.take_session(token, CeremonyKind::Login).await?;
        let user = self.session_user(&session).await?;

        let assertion = self
            .engine
            .finish_login(&user, &session.challenge, response)
            .map_err(|e| {
                tracing::warn!(
                    "Authentication verification failed for user '{}': {}",
                    user.name,
                    e
                );
                map_engine(e)
            })?;

        if !session
            .allowed_credentials
            .iter()
            .any(|id| *id == assertion.credential_id)
        {
            tracing::warn!(
                "User '{}' asserted credential {} outside the allowed set",
                user.name,
                hex::encode(&assertion.credential_id)
            );
            return Err(CeremonyError::VerificationFailed(
                "credential not allowed for this login".to_string(),
            ));
        }

        let update = self
            .directory
            .update_sign_count(
                user.id,
                &assertion.credential_id,
                assertion.sign_count,
                assertion.clone_warning,
            )
            .await
            .map_err(|e| match e {
                // Removed between begin and finish
                DirectoryError::CredentialNotFound => {
                    CeremonyError::VerificationFailed("credential is no longer registered".to_string())
                }
                other => map_directory(other),
            })?;

        if let Some(warning) = &update.warning {
            self.metrics.record_clone_warning();
            tracing::warn!(
                "Clone warning for user '{}': {} (policy: {:?})",
                user.name,
                warning,
                self.clone_policy
            );

            if self.clone_policy == ClonePolicy::Deny {
                return Err(CeremonyError::CloneDetected(warning.clone()));
            }

            self.directory
                .record_use(user.id, &assertion.credential_id)
                .await
                .map_err(map_directory)?;
        }

        tracing::info!("User '{}' authenticated successfully", user.name);

        Ok(LoginOutcome {
            user_id: user.id,
            credential_id: assertion.credential_id,
            sign_count: update.current,
            warning: update.warning,
        })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Consumes the session and checks it was begun for `kind`.
    async fn take_session(&self, token: &str, kind: CeremonyKind) -> Result<Session, CeremonyError> {
        // ---
        let session = self.sessions.consume(token).await.map_err(|e| {
            match e {
                SessionError::NotFound => tracing::warn!("{} session not found", kind),
                SessionError::Expired => tracing::warn!("{} session expired", kind),
            }
            CeremonyError::InvalidSession
        })?;

        if session.kind != kind {
            tracing::warn!(
                "Session begun for {} presented to {} finish (user: {})",
                session.kind,
                kind,
                session.user_id
            );
            return Err(CeremonyError::InvalidSession);
        }

        Ok(session)
    }

    async fn session_user(&self, session: &Session) -> Result<User, CeremonyError> {
        // ---
        self.directory.get_by_id(session.user_id).await.map_err(|e| {
            tracing::error!("Session references unresolvable user: {}", e);
            map_directory(e)
        })
    }

    fn record_start(&self, kind: CeremonyKind, result: &Result<CeremonyStart, CeremonyError>) {
        // ---
        match result {
            Ok(_) => self.metrics.record_ceremony_started(kind),
            Err(e) => self.metrics.record_ceremony_start_failed(kind, error_label(e)),
        }
    }

    fn record_finish<T>(&self, kind: CeremonyKind, result: &Result<T, CeremonyError>) {
        // ---
        let label = match result {
            Ok(_) => "success",
            Err(e) => error_label(e),
        };
        self.metrics.record_ceremony_finished(kind, label);
    }
}

fn validate_username(username: &str) -> Result<&str, CeremonyError> {
    // ---
    let username = username.trim();
    if username.is_empty() {
        return Err(CeremonyError::InvalidUsername);
    }
    Ok(username)
}

fn map_engine(err: EngineError) -> CeremonyError {
    // ---
    match err {
        EngineError::Verification(msg) => CeremonyError::VerificationFailed(msg),
        EngineError::Internal(msg) => CeremonyError::Engine(msg),
    }
}

fn map_directory(err: DirectoryError) -> CeremonyError {
    // ---
    match err {
        DirectoryError::UserNotFound(id) => CeremonyError::UnknownUser(id),
        DirectoryError::DuplicateCredential => CeremonyError::DuplicateCredential,
        DirectoryError::CredentialNotFound => {
            CeremonyError::VerificationFailed("credential not found".to_string())
        }
    }
}

fn error_label(err: &CeremonyError) -> &'static str {
    // ---
    match err {
        CeremonyError::InvalidUsername => "invalid_username",
        CeremonyError::InvalidSession => "invalid_session",
        CeremonyError::UnknownUser(_) => "unknown_user",
        CeremonyError::VerificationFailed(_) => "verification_failed",
        CeremonyError::DuplicateCredential => "duplicate_credential",
        CeremonyError::CloneDetected(_) => "clone_detected",
        CeremonyError::Engine(_) => "engine_error",
    }
}
