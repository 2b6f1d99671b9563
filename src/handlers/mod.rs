// Gateway module - controls public API for handlers
// Modules are private, only exported symbols are public

mod health;
mod login;
mod metrics;
mod register;
mod root;
mod shared_types;

// Core handlers
pub use health::health_check;
pub use metrics::metrics_handler;
pub use root::root_handler;

// Passkey registration handlers
pub use register::{register_finish, register_start};

// Passkey login handlers
pub use login::{login_finish, login_start};

pub use shared_types::SESSION_KEY_HEADER;
