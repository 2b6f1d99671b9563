// src/config.rs

//! Application configuration loaded from environment variables.
//!
//! This module defines all startup-time configuration for the service.
//! Configuration is validated eagerly and failures are treated as
//! deployment errors rather than recoverable runtime conditions.

use anyhow::Result;
use std::time::Duration;

// ============================================================
// Local macros (config-only, intentionally explicit)
// ============================================================

/// Reads a required environment variable.
///
/// # Behavior
/// - Fails fast if the variable is missing
/// - Produces a clear, human-readable error message
/// - Intended for startup-time configuration validation
macro_rules! required_env {
    // ---
    ($key:literal) => {
        std::env::var($key)
            .map_err(|_| anyhow::anyhow!(concat!("Missing required configuration: ", $key)))?
    };
}

/// Reads an optional environment variable and attempts to parse it.
///
/// If the variable is missing or cannot be parsed, the provided
/// default value is used. This macro is appropriate for non-critical
/// tuning parameters where fallback behavior is acceptable.
macro_rules! optional_env_parse {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        std::env::var($key)
            .ok()
            .and_then(|v| v.parse::<$ty>().ok())
            .unwrap_or($default)
    };
}

#[cfg(test)]
/// Asserts that a configuration constructor fails due to a missing
/// required environment variable.
macro_rules! assert_missing_config {
    // ---
    ($expr:expr, $key:literal) => {{
        let err = $expr.expect_err("expected configuration error");
        assert!(
            err.to_string()
                .contains(concat!("Missing required configuration: ", $key)),
            "unexpected error: {err}"
        );
    }};
}

// ============================================================
// Public configuration facade
// ============================================================

/// Aggregated application configuration.
///
/// This is the single source of truth for startup configuration.
/// All required configuration is validated eagerly during initialization.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub webauthn: webauthn::WebAuthnConfig,
    pub ceremony: ceremony::CeremonyConfig,
    pub metrics: telemetry::MetricsConfig,
}

impl AppConfig {
    /// Loads and validates all application configuration from the environment.
    ///
    /// # Errors
    /// Returns an error if any required configuration is missing or invalid.
    /// This function is intended to be called exactly once at startup.
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(Self {
            webauthn: webauthn::WebAuthnConfig::from_env()?,
            ceremony: ceremony::CeremonyConfig::from_env()?,
            metrics: telemetry::MetricsConfig::from_env(),
        })
    }
}

// ============================================================
// WebAuthn configuration
// ============================================================

mod webauthn {
    // ---
    use super::*;

    /// WebAuthn / Passkeys configuration.
    ///
    /// These values define the relying party identity and security
    /// origin used during registration and login ceremonies.
    #[derive(Debug, Clone)]
    pub struct WebAuthnConfig {
        /// Relying Party ID (typically a domain name).
        pub rp_id: String,

        /// Human-readable Relying Party name.
        pub rp_name: String,

        /// Fully-qualified origin (e.g. https://example.com).
        pub origin: String,
    }

    impl WebAuthnConfig {
        /// Builds a [`WebAuthnConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        /// Relying party identity must be explicitly provided.
        pub fn from_env() -> Result<Self> {
            // ---
            let rp_id = required_env!("PASSKEY_RP_ID");
            let origin = required_env!("PASSKEY_ORIGIN");

            let rp_name = std::env::var("PASSKEY_RP_NAME")
                .unwrap_or_else(|_| "Passkey Ceremony".to_string());

            Ok(Self {
                rp_id,
                rp_name,
                origin,
            })
        }
    }
}
pub use self::webauthn::WebAuthnConfig;

// ============================================================
// Ceremony configuration
// ============================================================

mod ceremony {
    // ---
    use super::*;
    use crate::domain::ClonePolicy;

    /// Session lifetime and clone handling for ceremonies.
    #[derive(Debug, Clone)]
    pub struct CeremonyConfig {
        /// How long a begun ceremony may wait for its finish step. Defaults to 300 seconds.
        pub ttl: Duration,

        /// How often abandoned sessions are swept. Defaults to 60 seconds.
        pub sweep_interval: Duration,

        /// What a clone warning does to a login. Defaults to deny.
        pub clone_policy: ClonePolicy,
    }

    impl CeremonyConfig {
        /// Builds a [`CeremonyConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if `PASSKEY_CEREMONY_TTL_SEC` is zero or
        /// `PASSKEY_CLONE_POLICY` is set to an unknown value.
        pub fn from_env() -> Result<Self> {
            // ---
            let ttl_secs = optional_env_parse!("PASSKEY_CEREMONY_TTL_SEC", u64, 300);
            let sweep_secs = optional_env_parse!("PASSKEY_SWEEP_INTERVAL_SEC", u64, 60);

            if ttl_secs == 0 {
                anyhow::bail!("Invalid PASSKEY_CEREMONY_TTL_SEC: must be at least 1 second");
            }

            let clone_policy = match std::env::var("PASSKEY_CLONE_POLICY") {
                Ok(raw) => raw
                    .parse::<ClonePolicy>()
                    .map_err(|e| anyhow::anyhow!("Invalid PASSKEY_CLONE_POLICY: {e}"))?,
                Err(_) => ClonePolicy::default(),
            };

            Ok(Self {
                ttl: Duration::from_secs(ttl_secs),
                // Zero would make the interval timer panic
                sweep_interval: Duration::from_secs(sweep_secs.max(1)),
                clone_policy,
            })
        }
    }
}
pub use self::ceremony::CeremonyConfig;

// ============================================================
// Metrics configuration
// ============================================================

mod telemetry {
    // ---

    /// Which metrics backend to install.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MetricsConfig {
        /// `true` for the Prometheus exporter, `false` for no-op.
        pub prometheus: bool,
    }

    impl MetricsConfig {
        pub fn from_env() -> Self {
            // ---
            let metrics_type =
                std::env::var("PASSKEY_METRICS_TYPE").unwrap_or_else(|_| "noop".to_string());

            Self {
                prometheus: metrics_type == "prom",
            }
        }
    }
}
pub use self::telemetry::MetricsConfig;

// ============================================================
// Tests
// ============================================================
