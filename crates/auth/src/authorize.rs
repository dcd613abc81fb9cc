use std::sync::Arc;

use indexmap::IndexSet;
use thiserror::Error;

use crate::{CredentialStore, Credentials, Permission, Secret, User};

/// Permissions a caller holds for the current request.
///
/// Either anonymous (empty) or backed by the matched user's record. The set
/// is shared and read-only.
#[derive(Debug, Clone, Default)]
pub struct EffectivePermissions {
    user: Option<Arc<User>>,
}

impl EffectivePermissions {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// `true` if credentials were presented and verified.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_deref().map(User::username)
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.user
            .as_deref()
            .is_some_and(|u| u.permissions().contains(permission))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.user.as_deref().into_iter().flat_map(|u| u.permissions().iter())
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_set(&self) -> IndexSet<Permission> {
        self.iter().cloned().collect()
    }
}

/// Permissions a route declares; any one of them grants access.
///
/// Empty means the route is open to everyone, including anonymous callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    any_of: Arc<[Permission]>,
}

impl RouteRequirement {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn any_of(permissions: impl IntoIterator<Item = Permission>) -> Self {
        let unique: IndexSet<Permission> = permissions.into_iter().collect();
        Self {
            any_of: unique.into_iter().collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.any_of.is_empty()
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.any_of
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// No credentials, unknown user, or wrong secret on a protected route.
    #[error("authentication required")]
    Unauthenticated,

    /// Valid credentials that hold none of the route's permissions.
    #[error("forbidden: requires one of {required:?}")]
    Forbidden { required: Vec<String> },
}

impl AuthzError {
    /// Scheme to advertise in the `WWW-Authenticate` challenge.
    pub fn challenge(&self) -> &'static str {
        crate::credentials::BASIC_SCHEME
    }
}

/// Resolve what the caller may do.
///
/// Absent credentials, an unknown username, or a secret mismatch all resolve
/// to the empty set; this never errors.
pub fn resolve_permissions(
    store: &CredentialStore,
    credentials: Option<&Credentials>,
) -> EffectivePermissions {
    let Some(credentials) = credentials else {
        return EffectivePermissions::anonymous();
    };

    match store.lookup(credentials.username()) {
        Some(user) if user.secret().matches(credentials.secret()) => EffectivePermissions {
            user: Some(user),
        },
        Some(_) => {
            tracing::debug!(username = credentials.username(), "secret mismatch");
            EffectivePermissions::anonymous()
        }
        None => {
            // Same hashing cost as a known user, so lookups do not reveal
            // which usernames exist.
            std::hint::black_box(Secret::new(String::new()).matches(credentials.secret()));
            tracing::debug!(username = credentials.username(), "unknown user");
            EffectivePermissions::anonymous()
        }
    }
}

/// Route guard: allow when nothing is required or when the caller holds at
/// least one required permission.
///
/// - No IO
/// - No panics
pub fn authorize(
    required: &RouteRequirement,
    resolved: &EffectivePermissions,
) -> Result<(), AuthzError> {
    if required.is_open() || required.permissions().iter().any(|p| resolved.contains(p)) {
        return Ok(());
    }

    if !resolved.is_authenticated() {
        return Err(AuthzError::Unauthenticated);
    }

    Err(AuthzError::Forbidden {
        required: required
            .permissions()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
    })
}
