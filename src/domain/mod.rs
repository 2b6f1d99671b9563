mod directory;
mod engine;
mod error;
mod metrics;
mod models;
mod session_store;

// Publicly expose the Metrics abstraction
pub use metrics::{Metrics, MetricsPtr};

// Publicly expose store abstractions
pub use directory::{DirectoryError, DirectoryPtr, UserDirectory};
pub use session_store::{Clock, ClockPtr, SessionError, SessionStore, SessionStorePtr};

// Publicly expose the ceremony engine seam
pub use engine::{
    CeremonyChallenge, CeremonyEngine, EngineError, EnginePtr, VerifiedAssertion,
    VerifiedCredential,
};

pub use error::CeremonyError;
pub use models::{
    CeremonyKind, CeremonyStart, ClonePolicy, CloneWarning, Credential, LoginOutcome, NewSession,
    RegistrationOutcome, Session, SignCountUpdate, User,
};
