// Test helpers are intentionally partially used
#![allow(dead_code)]

//! Shared fixtures for the ceremony integration tests.
//!
//! `FakeEngine` stands in for real authenticator cryptography. Responses are
//! plain JSON objects:
//!
//! ```json
//! { "id": "<hex credential id>", "challenge": "...", "signCount": 5 }
//! ```
//!
//! `challenge` is checked only when present, so a captured response can be
//! replayed verbatim against a later ceremony.

use passkey_ceremony::domain::{
    CeremonyChallenge, CeremonyEngine, CeremonyError, CeremonyKind, ClonePolicy, Credential,
    DirectoryPtr, EngineError, LoginOutcome, Metrics, RegistrationOutcome, User,
    VerifiedAssertion, VerifiedCredential,
};
use passkey_ceremony::{
    create_in_memory_directory, CeremonyService, CeremonyServicePtr, InMemorySessionStore,
    ManualClock,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TTL: Duration = Duration::from_secs(300);

// ============================================================================
// Fake engine
// ============================================================================

#[derive(Default)]
pub struct FakeEngine {
    // ---
    counter: AtomicU64,
    fail_begin: AtomicBool,
}

impl FakeEngine {
    // ---
    /// Make every subsequent begin step fail with an internal error.
    pub fn fail_begin(&self, fail: bool) {
        self.fail_begin.store(fail, Ordering::SeqCst);
    }

    fn next_challenge(&self, prefix: &str) -> Result<String, EngineError> {
        // ---
        if self.fail_begin.load(Ordering::SeqCst) {
            return Err(EngineError::Internal("engine offline".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{prefix}-{n}"))
    }
}

fn hex_ids(user: &User) -> Vec<String> {
    user.credentials.iter().map(|c| hex::encode(&c.id)).collect()
}

fn check_challenge(state: &[u8], response: &Value) -> Result<(), EngineError> {
    // ---
    if let Some(sent) = response.get("challenge").and_then(Value::as_str) {
        if sent.as_bytes() != state {
            return Err(EngineError::Verification("challenge mismatch".to_string()));
        }
    }
    Ok(())
}

fn credential_id(response: &Value) -> Result<Vec<u8>, EngineError> {
    // ---
    let id = response
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::Verification("missing credential id".to_string()))?;
    hex::decode(id).map_err(|e| EngineError::Verification(format!("bad credential id: {e}")))
}

impl CeremonyEngine for FakeEngine {
    // ---
    fn begin_registration(&self, user: &User) -> Result<CeremonyChallenge, EngineError> {
        // ---
        let challenge = self.next_challenge("reg")?;
        Ok(CeremonyChallenge {
            options: json!({
                "publicKey": {
                    "challenge": challenge,
                    "user": { "name": user.name, "displayName": user.display_name },
                    "excludeCredentials": hex_ids(user),
                }
            }),
            state: challenge.into_bytes(),
        })
    }

    fn finish_registration(
        &self,
        _user: &User,
        state: &[u8],
        response: &Value,
    ) -> Result<VerifiedCredential, EngineError> {
        // ---
        check_challenge(state, response)?;
        let id = credential_id(response)?;

        let transports = response
            .get("transports")
            .and_then(Value::as_array)
            .map(|t| {
                t.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(VerifiedCredential {
            public_key: format!("pk-{}", hex::encode(&id)).into_bytes(),
            id,
            sign_count: 0,
            transports,
        })
    }

    fn begin_login(&self, user: &User) -> Result<CeremonyChallenge, EngineError> {
        // ---
        let challenge = self.next_challenge("login")?;
        Ok(CeremonyChallenge {
            options: json!({
                "publicKey": {
                    "challenge": challenge,
                    "allowCredentials": hex_ids(user),
                }
            }),
            state: challenge.into_bytes(),
        })
    }

    fn finish_login(
        &self,
        user: &User,
        state: &[u8],
        response: &Value,
    ) -> Result<VerifiedAssertion, EngineError> {
        // ---
        check_challenge(state, response)?;
        let id = credential_id(response)?;

        // Stand-in for signature verification against the stored key
        if user.credential(&id).is_none() {
            return Err(EngineError::Verification("unknown credential".to_string()));
        }

        Ok(VerifiedAssertion {
            credential_id: id,
            sign_count: response
                .get("signCount")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32,
            clone_warning: response
                .get("cloneWarning")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

// ============================================================================
// Recording metrics
// ============================================================================

#[derive(Default)]
pub struct RecordingMetrics {
    // ---
    pub started: Mutex<Vec<CeremonyKind>>,
    pub start_failures: Mutex<Vec<(CeremonyKind, &'static str)>>,
    pub finished: Mutex<Vec<(CeremonyKind, &'static str)>>,
    pub clone_warnings: AtomicU64,
}

impl RecordingMetrics {
    // ---
    pub fn finished_with(&self, kind: CeremonyKind, result: &str) -> usize {
        // ---
        self.finished
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, r)| *k == kind && *r == result)
            .count()
    }
}

impl Metrics for RecordingMetrics {
    // ---
    fn render(&self) -> String {
        format!(
            "recorded_clone_warnings {}\n",
            self.clone_warnings.load(Ordering::SeqCst)
        )
    }

    fn record_ceremony_started(&self, kind: CeremonyKind) {
        self.started.lock().unwrap().push(kind);
    }

    fn record_ceremony_start_failed(&self, kind: CeremonyKind, result: &'static str) {
        self.start_failures.lock().unwrap().push((kind, result));
    }

    fn record_ceremony_finished(&self, kind: CeremonyKind, result: &'static str) {
        self.finished.lock().unwrap().push((kind, result));
    }

    fn record_clone_warning(&self) {
        self.clone_warnings.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A ceremony service over in-memory stores, a fake engine and a manual clock.
pub struct Harness {
    // ---
    pub service: CeremonyServicePtr,
    pub directory: DirectoryPtr,
    pub sessions: Arc<InMemorySessionStore>,
    pub clock: Arc<ManualClock>,
    pub engine: Arc<FakeEngine>,
    pub metrics: Arc<RecordingMetrics>,
}

impl Harness {
    // ---
    pub fn new(policy: ClonePolicy) -> Self {
        // ---
        let directory = create_in_memory_directory();
        let clock = Arc::new(ManualClock::default());
        let sessions = Arc::new(InMemorySessionStore::with_clock(TTL, clock.clone()));
        let engine = Arc::new(FakeEngine::default());
        let metrics = Arc::new(RecordingMetrics::default());

        let service = Arc::new(CeremonyService::new(
            directory.clone(),
            sessions.clone(),
            engine.clone(),
            metrics.clone(),
            policy,
        ));

        Self {
            service,
            directory,
            sessions,
            clock,
            engine,
            metrics,
        }
    }

    /// Runs a full registration and returns its outcome.
    pub async fn register(&self, username: &str, credential_id: &[u8]) -> RegistrationOutcome {
        // ---
        let start = self
            .service
            .begin_registration(username)
            .await
            .expect("begin registration");
        let response = attestation(credential_id, &start.options);
        self.service
            .finish_registration(&start.token, &response)
            .await
            .expect("finish registration")
    }

    /// Runs a full login asserting `sign_count` for `credential_id`.
    pub async fn login(
        &self,
        username: &str,
        credential_id: &[u8],
        sign_count: u32,
    ) -> Result<LoginOutcome, CeremonyError> {
        // ---
        let start = self.service.begin_login(username).await?;
        let response = assertion(credential_id, sign_count, &start.options);
        self.service.finish_login(&start.token, &response).await
    }

    /// Current stored counter for one of `user_id`'s credentials.
    pub async fn stored_count(&self, user_id: uuid::Uuid, credential_id: &[u8]) -> u32 {
        // ---
        self.stored_credential(user_id, credential_id).await.sign_count
    }

    /// Last accepted use of one of `user_id`'s credentials.
    pub async fn last_used_at(
        &self,
        user_id: uuid::Uuid,
        credential_id: &[u8],
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        // ---
        self.stored_credential(user_id, credential_id).await.last_used_at
    }

    async fn stored_credential(&self, user_id: uuid::Uuid, credential_id: &[u8]) -> Credential {
        // ---
        let user = self.directory.get_by_id(user_id).await.expect("user exists");
        user.credential(credential_id)
            .expect("credential exists")
            .clone()
    }
}

// ============================================================================
// Response builders
// ============================================================================

fn challenge_of(options: &Value) -> Value {
    options["publicKey"]["challenge"].clone()
}

/// Attestation answering `options` for a new credential.
pub fn attestation(credential_id: &[u8], options: &Value) -> Value {
    // ---
    json!({
        "id": hex::encode(credential_id),
        "challenge": challenge_of(options),
        "transports": ["usb", "nfc"],
    })
}

/// Assertion answering `options` with the given counter.
pub fn assertion(credential_id: &[u8], sign_count: u32, options: &Value) -> Value {
    // ---
    json!({
        "id": hex::encode(credential_id),
        "challenge": challenge_of(options),
        "signCount": sign_count,
    })
}

/// Assertion carrying no challenge, accepted by any login ceremony.
pub fn replayable_assertion(credential_id: &[u8], sign_count: u32) -> Value {
    // ---
    json!({
        "id": hex::encode(credential_id),
        "signCount": sign_count,
    })
}
