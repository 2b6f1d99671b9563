//! In-memory ceremony session store.
//!
//! Sessions are single-use: `consume` removes the entry in the same step
//! that reads it, so a token can never be redeemed twice. Expiry is checked
//! lazily on `consume` and eagerly by `sweep_expired`, which the background
//! sweeper calls on an interval to reclaim abandoned ceremonies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    ClockPtr, NewSession, Session, SessionError, SessionStore, SessionStorePtr,
};
use crate::infrastructure::clock::SystemClock;

pub fn create_in_memory_sessions(ttl: Duration) -> SessionStorePtr {
    // ---
    Arc::new(InMemorySessionStore::new(ttl))
}

/// Token-keyed session store with a fixed ceremony window.
pub struct InMemorySessionStore {
    // ---
    sessions: DashMap<String, Session>,
    ttl: Duration,
    clock: ClockPtr,
}

impl InMemorySessionStore {
    // ---
    pub fn new(ttl: Duration) -> Self {
        // ---
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: ClockPtr) -> Self {
        // ---
        Self {
            sessions: DashMap::new(),
            ttl,
            clock,
        }
    }

    fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // ---
        match now.signed_duration_since(created_at).to_std() {
            Ok(elapsed) => elapsed >= self.ttl,
            // created_at in the future (clock skew): not expired
            Err(_) => false,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    // ---
    async fn create(&self, session: NewSession) -> String {
        // ---
        let created_at = self.clock.now();

        loop {
            let token = Uuid::new_v4().to_string();

            // Vacant-entry insert so an outstanding token is never overwritten
            if let Entry::Vacant(entry) = self.sessions.entry(token.clone()) {
                entry.insert(Session {
                    token: token.clone(),
                    kind: session.kind,
                    user_id: session.user_id,
                    challenge: session.challenge,
                    allowed_credentials: session.allowed_credentials,
                    created_at,
                });

                tracing::debug!("Stored {} session for user: {}", session.kind, session.user_id);
                return token;
            }
        }
    }

    async fn consume(&self, token: &str) -> Result<Session, SessionError> {
        // ---
        let (_, session) = self.sessions.remove(token).ok_or(SessionError::NotFound)?;

        if self.is_expired(session.created_at, self.clock.now()) {
            tracing::debug!("Session for user {} expired before use", session.user_id);
            return Err(SessionError::Expired);
        }

        Ok(session)
    }

    async fn sweep_expired(&self) -> usize {
        // ---
        let now = self.clock.now();
        let before = self.sessions.len();

        self.sessions.retain(|_, session| !self.is_expired(session.created_at, now));

        before.saturating_sub(self.sessions.len())
    }

    async fn pending(&self) -> usize {
        self.sessions.len()
    }
}
