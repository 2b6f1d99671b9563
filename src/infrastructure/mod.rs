pub mod clock;
mod directory;
pub mod metrics;
mod sessions;
mod webauthn;

// Re-export the factory functions for easy access
pub use clock::{ManualClock, SystemClock};
pub use directory::{create_in_memory_directory, InMemoryDirectory};
pub use metrics::{create_noop_metrics, create_prom_metrics};
pub use sessions::{create_in_memory_sessions, spawn_session_sweeper, InMemorySessionStore};
pub use webauthn::{create_webauthn, WebauthnEngine};
