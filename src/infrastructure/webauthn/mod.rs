//! WebAuthn-backed ceremony engine.
//!
//! This module provides a factory for the relying-party `Webauthn` instance
//! and a [`CeremonyEngine`] implementation on top of it. Registered passkeys
//! are kept in the directory as their serialized JSON form (the credential's
//! `public_key`), and in-flight protocol state travels through the session
//! store as serialized bytes.

use std::str::FromStr;
use std::time::Duration;

use crate::config::WebAuthnConfig;
use crate::domain::{
    CeremonyChallenge, CeremonyEngine, EngineError, User, VerifiedAssertion, VerifiedCredential,
};
use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use webauthn_rs::prelude::*;

/// Creates a configured WebAuthn instance from application config.
///
/// # Errors
/// Returns an error if the origin URL or RP ID are malformed.
pub fn create_webauthn(config: &WebAuthnConfig, timeout: Duration) -> Result<Webauthn> {
    // ---
    tracing::debug!("Creating with config:{:?}", config);

    let url = Url::from_str(config.origin.as_str())?;
    let builder = WebauthnBuilder::new(&config.rp_id, &url)?;
    let webauthn = builder.rp_name(&config.rp_name).timeout(timeout).build()?;

    Ok(webauthn)
}

/// Login state carried between `begin_login` and `finish_login`.
///
/// Users without usable passkeys get a decoy challenge so the response
/// shape does not reveal whether the account exists.
#[derive(Serialize, Deserialize)]
enum LoginState {
    Passkey(PasskeyAuthentication),
    Decoy,
}

/// [`CeremonyEngine`] backed by `webauthn-rs` passkey flows.
pub struct WebauthnEngine {
    // ---
    webauthn: Webauthn,
    rp_id: String,
    timeout: Duration,
}

impl WebauthnEngine {
    // ---
    pub fn new(webauthn: Webauthn, rp_id: String, timeout: Duration) -> Self {
        // ---
        Self {
            webauthn,
            rp_id,
            timeout,
        }
    }

    /// Builds the engine straight from configuration.
    pub fn from_config(config: &WebAuthnConfig, timeout: Duration) -> Result<Self> {
        // ---
        let webauthn = create_webauthn(config, timeout)?;
        Ok(Self::new(webauthn, config.rp_id.clone(), timeout))
    }

    fn decoy_login(&self) -> Result<CeremonyChallenge, EngineError> {
        // ---
        let challenge: [u8; 32] = rand::random();
        let options = serde_json::json!({
            "publicKey": {
                "challenge": URL_SAFE_NO_PAD.encode(challenge),
                "timeout": self.timeout.as_millis() as u64,
                "rpId": self.rp_id,
                "allowCredentials": [],
                "userVerification": "preferred",
            }
        });

        Ok(CeremonyChallenge {
            options,
            state: encode_state(&LoginState::Decoy)?,
        })
    }
}

impl CeremonyEngine for WebauthnEngine {
    // ---
    fn begin_registration(&self, user: &User) -> Result<CeremonyChallenge, EngineError> {
        // ---
        // Exclude existing keys to prevent duplicate registration
        let exclude: Vec<CredentialID> = user
            .credentials
            .iter()
            .map(|c| c.id.clone().into())
            .collect();
        let exclude = (!exclude.is_empty()).then_some(exclude);

        let (options, registration) = self
            .webauthn
            .start_passkey_registration(user.id, &user.name, &user.display_name, exclude)
            .map_err(|e| EngineError::Internal(format!("failed to start registration: {e}")))?;

        Ok(CeremonyChallenge {
            options: encode_options(&options)?,
            state: encode_state(&registration)?,
        })
    }

    fn finish_registration(
        &self,
        _user: &User,
        state: &[u8],
        response: &serde_json::Value,
    ) -> Result<VerifiedCredential, EngineError> {
        // ---
        let registration: PasskeyRegistration = decode_state(state)?;
        let credential: RegisterPublicKeyCredential = serde_json::from_value(response.clone())
            .map_err(|e| EngineError::Verification(format!("malformed attestation response: {e}")))?;

        let passkey = self
            .webauthn
            .finish_passkey_registration(&credential, &registration)
            .map_err(|e| EngineError::Verification(e.to_string()))?;

        // The serialized passkey doubles as the stored public key
        let public_key = serde_json::to_vec(&passkey)
            .map_err(|e| EngineError::Internal(format!("failed to serialize passkey: {e}")))?;

        Ok(VerifiedCredential {
            id: passkey.cred_id().to_vec(),
            public_key,
            sign_count: 0, // Initial counter value for new credentials
            transports: transport_hints(response),
        })
    }

    fn begin_login(&self, user: &User) -> Result<CeremonyChallenge, EngineError> {
        // ---
        let passkeys: Vec<Passkey> = user
            .credentials
            .iter()
            .filter_map(|cred| {
                serde_json::from_slice(&cred.public_key)
                    .map_err(|e| {
                        tracing::error!(
                            "Failed to deserialize passkey for credential {}: {:?}",
                            hex::encode(&cred.id),
                            e
                        );
                    })
                    .ok()
            })
            .collect();

        if passkeys.is_empty() {
            return self.decoy_login();
        }

        let (options, authentication) = self
            .webauthn
            .start_passkey_authentication(&passkeys)
            .map_err(|e| EngineError::Internal(format!("failed to start authentication: {e}")))?;

        Ok(CeremonyChallenge {
            options: encode_options(&options)?,
            state: encode_state(&LoginState::Passkey(authentication))?,
        })
    }

    fn finish_login(
        &self,
        _user: &User,
        state: &[u8],
        response: &serde_json::Value,
    ) -> Result<VerifiedAssertion, EngineError> {
        // ---
        let LoginState::Passkey(authentication) = decode_state::<LoginState>(state)? else {
            return Err(EngineError::Verification(
                "no credential matches this login".to_string(),
            ));
        };

        let credential: PublicKeyCredential = serde_json::from_value(response.clone())
            .map_err(|e| EngineError::Verification(format!("malformed assertion response: {e}")))?;

        let result = self
            .webauthn
            .finish_passkey_authentication(&credential, &authentication)
            .map_err(|e| EngineError::Verification(e.to_string()))?;

        Ok(VerifiedAssertion {
            credential_id: result.cred_id().to_vec(),
            sign_count: result.counter(),
            clone_warning: false,
        })
    }
}

fn encode_options<T: Serialize>(options: &T) -> Result<serde_json::Value, EngineError> {
    // ---
    serde_json::to_value(options)
        .map_err(|e| EngineError::Internal(format!("failed to serialize options: {e}")))
}

fn encode_state<T: Serialize>(state: &T) -> Result<Vec<u8>, EngineError> {
    // ---
    serde_json::to_vec(state)
        .map_err(|e| EngineError::Internal(format!("failed to serialize ceremony state: {e}")))
}

fn decode_state<T: for<'de> Deserialize<'de>>(state: &[u8]) -> Result<T, EngineError> {
    // ---
    serde_json::from_slice(state)
        .map_err(|e| EngineError::Internal(format!("failed to deserialize ceremony state: {e}")))
}

/// Transport hints the client reported alongside its attestation.
fn transport_hints(response: &serde_json::Value) -> Vec<String> {
    // ---
    response
        .get("response")
        .and_then(|r| r.get("transports"))
        .and_then(|t| t.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Credential;

    const TIMEOUT: Duration = Duration::from_secs(300);

    fn test_config() -> WebAuthnConfig {
        WebAuthnConfig {
            rp_id: "localhost".to_string(),
            rp_name: "Test App".to_string(),
            origin: "http://localhost:8080".to_string(),
        }
    }

    fn engine() -> WebauthnEngine {
        WebauthnEngine::from_config(&test_config(), TIMEOUT).unwrap()
    }

    #[test]
    fn create_webauthn_success() {
        let result = create_webauthn(&test_config(), TIMEOUT);
        assert!(result.is_ok());
    }

    #[test]
    fn create_webauthn_invalid_origin() {
        let config = WebAuthnConfig {
            origin: "not-a-valid-url".to_string(),
            ..test_config()
        };

        let result = create_webauthn(&config, TIMEOUT);
        assert!(result.is_err());
    }

    #[test]
    fn begin_registration_returns_public_key_options() {
        let user = User::new("bard@example.com".to_string());

        let challenge = engine().begin_registration(&user).unwrap();

        let public_key = challenge.options.get("publicKey").expect("publicKey");
        assert!(public_key.get("challenge").is_some());
        assert!(!challenge.state.is_empty());
    }

    #[test]
    fn begin_login_without_passkeys_returns_decoy() {
        let user = User::new("ghost".to_string());

        let challenge = engine().begin_login(&user).unwrap();

        let public_key = &challenge.options["publicKey"];
        assert_eq!(public_key["rpId"], "localhost");
        assert_eq!(public_key["allowCredentials"], serde_json::json!([]));
        assert!(public_key["challenge"].as_str().is_some());
    }

    #[test]
    fn begin_login_skips_unreadable_passkeys() {
        let mut user = User::new("smaug".to_string());
        user.credentials
            .push(Credential::new(vec![1, 2], b"not a passkey".to_vec(), 0, vec![]));

        let challenge = engine().begin_login(&user).unwrap();
        assert_eq!(challenge.options["publicKey"]["allowCredentials"], serde_json::json!([]));
    }

    #[test]
    fn finish_login_against_decoy_fails_verification() {
        let engine = engine();
        let user = User::new("ghost".to_string());
        let challenge = engine.begin_login(&user).unwrap();

        let result = engine.finish_login(&user, &challenge.state, &serde_json::json!({}));
        assert!(matches!(result, Err(EngineError::Verification(_))));
    }

    #[test]
    fn finish_registration_rejects_malformed_response() {
        let engine = engine();
        let user = User::new("beorn".to_string());
        let challenge = engine.begin_registration(&user).unwrap();

        let result = engine.finish_registration(
            &user,
            &challenge.state,
            &serde_json::json!({ "garbage": true }),
        );
        assert!(matches!(result, Err(EngineError::Verification(_))));
    }

    #[test]
    fn finish_registration_rejects_corrupt_state() {
        let user = User::new("beorn".to_string());

        let result = engine().finish_registration(&user, b"{", &serde_json::json!({}));
        assert!(matches!(result, Err(EngineError::Internal(_))));
    }

    #[test]
    fn transport_hints_read_from_response() {
        let response = serde_json::json!({ "response": { "transports": ["usb", "nfc", 3] } });
        assert_eq!(transport_hints(&response), vec!["usb", "nfc"]);
        assert!(transport_hints(&serde_json::json!({})).is_empty());
    }
}
