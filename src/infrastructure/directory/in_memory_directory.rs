use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    CloneWarning, Credential, DirectoryError, DirectoryPtr, SignCountUpdate, User, UserDirectory,
};

pub fn create_in_memory_directory() -> DirectoryPtr {
    // ---
    Arc::new(InMemoryDirectory::new())
}

/// Process-lifetime user directory backed by sharded concurrent maps.
///
/// `names` is the uniqueness index; `users` holds the records. A name is
/// only ever bound while its `names` shard entry is locked, so racing
/// first-time callers all observe the same user.
#[derive(Default)]
pub struct InMemoryDirectory {
    // ---
    names: DashMap<String, Uuid>,
    users: DashMap<Uuid, User>,
}

impl InMemoryDirectory {
    // ---
    pub fn new() -> Self {
        // ---
        Self::default()
    }

    /// Number of users known to the directory.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    // ---
    async fn get_or_create(&self, name: &str) -> Result<User, DirectoryError> {
        // ---
        let user_id = match self.names.entry(name.to_string()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let mut user = User::new(name.to_string());
                while self.users.contains_key(&user.id) {
                    user.id = Uuid::new_v4();
                }
                let user_id = user.id;
                self.users.insert(user_id, user);
                entry.insert(user_id);

                tracing::info!("Created directory entry for user: {} ({})", name, user_id);
                user_id
            }
        };

        self.get_by_id(user_id).await
    }

    async fn get_by_id(&self, user_id: Uuid) -> Result<User, DirectoryError> {
        // ---
        self.users
            .get(&user_id)
            .map(|user| user.value().clone())
            .ok_or(DirectoryError::UserNotFound(user_id))
    }

    async fn add_credential(&self, user_id: Uuid, credential: Credential) -> Result<(), DirectoryError> {
        // ---
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or(DirectoryError::UserNotFound(user_id))?;

        if user.credential(&credential.id).is_some() {
            tracing::warn!(
                "Rejected duplicate credential {} for user: {}",
                hex::encode(&credential.id),
                user.name
            );
            return Err(DirectoryError::DuplicateCredential);
        }

        tracing::debug!(
            "Stored credential {} for user: {}",
            hex::encode(&credential.id),
            user.name
        );
        user.credentials.push(credential);

        Ok(())
    }

    async fn update_sign_count(
        &self,
        user_id: Uuid,
        credential_id: &[u8],
        new_count: u32,
        authenticator_warning: bool,
    ) -> Result<SignCountUpdate, DirectoryError> {
        // ---
        // The shard write lock is held for the whole compare-and-update.
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or(DirectoryError::UserNotFound(user_id))?;

        let credential = user
            .credentials
            .iter_mut()
            .find(|c| c.id == credential_id)
            .ok_or(DirectoryError::CredentialNotFound)?;

        let previous = credential.sign_count;
        let regressed = previous != 0 && new_count <= previous;

        credential.sign_count = previous.max(new_count);

        let warning = (regressed || authenticator_warning).then(|| CloneWarning {
            user_id,
            credential_id: credential_id.to_vec(),
            stored_count: previous,
            reported_count: new_count,
            authenticator_flagged: authenticator_warning,
        });

        // Warned assertions are stamped by `record_use` once the clone policy admits them
        if warning.is_none() {
            credential.last_used_at = Some(Utc::now());
        }

        Ok(SignCountUpdate {
            previous,
            current: credential.sign_count,
            warning,
        })
    }

    async fn record_use(&self, user_id: Uuid, credential_id: &[u8]) -> Result<(), DirectoryError> {
        // ---
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or(DirectoryError::UserNotFound(user_id))?;

        let credential = user
            .credentials
            .iter_mut()
            .find(|c| c.id == credential_id)
            .ok_or(DirectoryError::CredentialNotFound)?;

        credential.last_used_at = Some(Utc::now());
        Ok(())
    }
}
