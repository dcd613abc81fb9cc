//! API user accounts.

use indexmap::IndexSet;
use thiserror::Error;

use crate::{Permission, Secret};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error("username must not be empty")]
    EmptyUsername,

    #[error("username must not contain ':'")]
    InvalidUsername,
}

/// An account allowed to call the API.
///
/// # Invariants
/// - `username` is non-empty and contains no `:` (it must survive Basic auth).
/// - Identity is the lowercased username; see [`User::key`].
/// - Immutable once built: the credential store replaces whole records.
#[derive(Debug, Clone)]
pub struct User {
    username: String,
    secret: Secret,
    permissions: IndexSet<Permission>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        secret: Secret,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Self, UserError> {
        let username = username.into();
        if username.is_empty() {
            return Err(UserError::EmptyUsername);
        }
        if username.contains(':') {
            return Err(UserError::InvalidUsername);
        }

        Ok(Self {
            username,
            secret,
            permissions: permissions.into_iter().collect(),
        })
    }

    /// Build without validation, for names known to be valid.
    pub(crate) fn from_parts(
        username: String,
        secret: Secret,
        permissions: IndexSet<Permission>,
    ) -> Self {
        Self {
            username,
            secret,
            permissions,
        }
    }

    /// Username as configured (original casing).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Case-insensitive store key.
    pub fn key(&self) -> String {
        normalize_username(&self.username)
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Granted permissions, in the order they were listed.
    pub fn permissions(&self) -> &IndexSet<Permission> {
        &self.permissions
    }
}

pub(crate) fn normalize_username(username: &str) -> String {
    username.to_lowercase()
}
