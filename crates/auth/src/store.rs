//! In-memory credential store.
//!
//! Read-mostly: every request performs a lookup, while writes only happen at
//! startup and on an explicit reload. Reloads go through
//! [`CredentialStore::replace_all`], which swaps the whole user set under one
//! write lock so readers observe either the old or the new set, never a
//! partially cleared one.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::registry::PermissionRegistry;
use crate::secret::GENERATED_SECRET_LEN;
use crate::user::normalize_username;
use crate::{Secret, User};

/// Username of the account seeded when no persisted users exist.
pub const DEFAULT_USERNAME: &str = "default";

#[derive(Debug, Default)]
pub struct CredentialStore {
    users: RwLock<HashMap<String, Arc<User>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive exact lookup.
    ///
    /// A poisoned lock reads as "no such user" (fail closed).
    pub fn lookup(&self, username: &str) -> Option<Arc<User>> {
        let users = self.users.read().ok()?;
        users.get(&normalize_username(username)).cloned()
    }

    /// Insert or replace the user under its lowercased name. Permissions are
    /// not merged with a previous record.
    pub fn upsert(&self, user: User) {
        match self.users.write() {
            Ok(mut users) => {
                users.insert(user.key(), Arc::new(user));
            }
            Err(_) => tracing::error!("credential store lock poisoned; upsert dropped"),
        }
    }

    pub fn clear(&self) {
        match self.users.write() {
            Ok(mut users) => users.clear(),
            Err(_) => tracing::error!("credential store lock poisoned; clear dropped"),
        }
    }

    /// Clear and repopulate in one critical section.
    ///
    /// Later entries win when two share a case-insensitive username.
    pub fn replace_all(&self, users: impl IntoIterator<Item = User>) {
        let fresh: HashMap<String, Arc<User>> = users
            .into_iter()
            .map(|user| (user.key(), Arc::new(user)))
            .collect();

        match self.users.write() {
            Ok(mut current) => {
                tracing::info!(users = fresh.len(), "credential store replaced");
                *current = fresh;
            }
            Err(_) => tracing::error!("credential store lock poisoned; reload dropped"),
        }
    }

    /// Snapshot of all users. Order is unspecified.
    pub fn all(&self) -> Vec<Arc<User>> {
        match self.users.read() {
            Ok(users) => users.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert the bootstrap administrator: every registered permission and a
    /// freshly generated secret. Returns it so the caller can report the
    /// credentials to the operator.
    pub fn seed_default(&self, registry: &PermissionRegistry) -> Arc<User> {
        let user = Arc::new(User::from_parts(
            DEFAULT_USERNAME.to_string(),
            Secret::generate(GENERATED_SECRET_LEN),
            registry.iter().cloned().collect(),
        ));
        match self.users.write() {
            Ok(mut users) => {
                users.insert(user.key(), user.clone());
            }
            Err(_) => tracing::error!("credential store lock poisoned; default user not stored"),
        }
        user
    }
}
