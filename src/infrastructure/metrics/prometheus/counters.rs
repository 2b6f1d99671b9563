use crate::domain::CeremonyKind;
use metrics::counter;

/// Increment the counter of begun ceremonies.
pub fn increment_ceremony_started(kind: CeremonyKind) {
    counter!("passkey_ceremonies_started_total", "ceremony" => kind.as_str()).increment(1);
}

/// Increment the counter of begin steps that failed, labelled by error.
pub fn increment_ceremony_start_failed(kind: CeremonyKind, result: &'static str) {
    counter!(
        "passkey_ceremony_start_failures_total",
        "ceremony" => kind.as_str(),
        "result" => result
    )
    .increment(1);
}

/// Increment the counter of finish steps, labelled by outcome.
pub fn increment_ceremony_finished(kind: CeremonyKind, result: &'static str) {
    counter!(
        "passkey_ceremonies_finished_total",
        "ceremony" => kind.as_str(),
        "result" => result
    )
    .increment(1);
}

/// Increment the counter of logins that raised a clone warning.
pub fn increment_clone_warning() {
    counter!("passkey_clone_warnings_total").increment(1);
}
