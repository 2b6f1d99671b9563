use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Represents a user known to the credential directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    // ---
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub credentials: Vec<Credential>,
    pub created_at: DateTime<Utc>,
}

impl User {
    // ---
    pub fn new(name: String) -> Self {
        // ---
        Self {
            id: Uuid::new_v4(),
            display_name: name.clone(),
            name,
            credentials: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Look up one of this user's credentials by its ID.
    pub fn credential(&self, credential_id: &[u8]) -> Option<&Credential> {
        // ---
        self.credentials.iter().find(|c| c.id == credential_id)
    }

    /// IDs of every registered credential, in registration order.
    pub fn credential_ids(&self) -> Vec<Vec<u8>> {
        // ---
        self.credentials.iter().map(|c| c.id.clone()).collect()
    }
}

/// Represents a registered passkey credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    // ---
    /// Unique credential ID (from authenticator)
    pub id: Vec<u8>,

    /// Verification key material, opaque to the directory
    pub public_key: Vec<u8>,

    /// Signature counter (for clone detection)
    pub sign_count: u32,

    /// How the authenticator may be reached ("usb", "internal", ...)
    pub transports: Vec<String>,

    /// When this credential was registered
    pub created_at: DateTime<Utc>,

    /// Last successful assertion with this credential
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Credential {
    // ---
    pub fn new(id: Vec<u8>, public_key: Vec<u8>, sign_count: u32, transports: Vec<String>) -> Self {
        // ---
        Self {
            id,
            public_key,
            sign_count,
            transports,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }
}

// ---

/// Which ceremony a session was begun for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeremonyKind {
    Registration,
    Login,
}

impl CeremonyKind {
    // ---
    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            CeremonyKind::Registration => "registration",
            CeremonyKind::Login => "login",
        }
    }
}

impl fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ceremony state handed to the session store by a `Begin*` step.
#[derive(Debug, Clone)]
pub struct NewSession {
    // ---
    pub kind: CeremonyKind,
    pub user_id: Uuid,
    pub challenge: Vec<u8>,
    pub allowed_credentials: Vec<Vec<u8>>,
}

impl NewSession {
    // ---
    pub fn registration(user_id: Uuid, challenge: Vec<u8>) -> Self {
        // ---
        Self {
            kind: CeremonyKind::Registration,
            user_id,
            challenge,
            allowed_credentials: Vec::new(),
        }
    }

    pub fn login(user_id: Uuid, challenge: Vec<u8>, allowed_credentials: Vec<Vec<u8>>) -> Self {
        // ---
        Self {
            kind: CeremonyKind::Login,
            user_id,
            challenge,
            allowed_credentials,
        }
    }
}

/// An in-flight ceremony, keyed by its single-use token.
#[derive(Debug, Clone)]
pub struct Session {
    // ---
    pub token: String,
    pub kind: CeremonyKind,
    pub user_id: Uuid,

    /// Opaque ceremony state produced by the engine when the ceremony began
    pub challenge: Vec<u8>,

    /// Credential IDs the client may assert with (login only)
    pub allowed_credentials: Vec<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

// ---

/// Signal that a credential's counter failed to advance, or that the
/// engine itself flagged the assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneWarning {
    // ---
    pub user_id: Uuid,
    #[serde(with = "hex_bytes")]
    pub credential_id: Vec<u8>,
    pub stored_count: u32,
    pub reported_count: u32,
    pub authenticator_flagged: bool,
}

impl fmt::Display for CloneWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "credential {} stored={} reported={} flagged={}",
            hex::encode(&self.credential_id),
            self.stored_count,
            self.reported_count,
            self.authenticator_flagged
        )
    }
}

/// Result of an atomic sign-count compare-and-update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignCountUpdate {
    // ---
    pub previous: u32,
    pub current: u32,
    pub warning: Option<CloneWarning>,
}

/// What to do with a login that raised a clone warning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClonePolicy {
    /// Reject the login.
    #[default]
    Deny,
    /// Let the login through with the warning attached.
    Warn,
}

impl FromStr for ClonePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" => Ok(ClonePolicy::Deny),
            "warn" => Ok(ClonePolicy::Warn),
            other => Err(format!("unknown clone policy: {other}")),
        }
    }
}

// ---

/// Output of a `Begin*` step: options for the client plus the session token.
#[derive(Debug, Clone)]
pub struct CeremonyStart {
    // ---
    pub options: serde_json::Value,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    // ---
    pub user_id: Uuid,
    pub credential_id: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    // ---
    pub user_id: Uuid,
    pub credential_id: Vec<u8>,
    pub sign_count: u32,
    pub warning: Option<CloneWarning>,
}

mod hex_bytes {
    // ---
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }
}
