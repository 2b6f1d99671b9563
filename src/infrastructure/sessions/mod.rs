mod in_memory_sessions;

pub use in_memory_sessions::{create_in_memory_sessions, InMemorySessionStore};

use crate::domain::SessionStorePtr;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawns a task that periodically drops abandoned ceremony sessions.
///
/// Must be called from within a Tokio runtime. The task runs until the
/// returned handle is aborted or the runtime shuts down.
pub fn spawn_session_sweeper(store: SessionStorePtr, every: Duration) -> JoinHandle<()> {
    // ---
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let removed = store.sweep_expired().await;
            if removed > 0 {
                tracing::debug!("Swept {} expired ceremony sessions", removed);
            }
        }
    })
}
