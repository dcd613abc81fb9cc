//! Catalog of every permission the server knows about.
//!
//! Registration happens on a [`PermissionRegistryBuilder`] during startup. Once
//! [`build`](PermissionRegistryBuilder::build) is called the catalog is frozen:
//! [`PermissionRegistry`] has no mutating API, so nothing can be registered
//! after the server starts accepting connections.

use indexmap::IndexSet;

use crate::permissions::{self, Permission};

#[derive(Debug, Clone, Default)]
pub struct PermissionRegistryBuilder {
    permissions: IndexSet<Permission>,
}

impl PermissionRegistryBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-populated with the built-in catalog.
    pub fn with_builtins() -> Self {
        let mut builder = Self::new();
        for p in permissions::builtin() {
            builder.register(p);
        }
        builder
    }

    /// Add a permission. Returns `false` if it was already registered.
    pub fn register(&mut self, permission: Permission) -> bool {
        let added = self.permissions.insert(permission);
        if !added {
            tracing::debug!("permission already registered; ignoring");
        }
        added
    }

    pub fn build(self) -> PermissionRegistry {
        tracing::debug!(count = self.permissions.len(), "permission registry frozen");
        PermissionRegistry {
            permissions: self.permissions,
        }
    }
}

/// Frozen permission catalog. Share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    permissions: IndexSet<Permission>,
}

impl PermissionRegistry {
    /// Frozen registry holding only the built-in catalog.
    pub fn builtin() -> Self {
        PermissionRegistryBuilder::with_builtins().build()
    }

    /// Every registered permission, in registration order.
    pub fn register_all(&self) -> &IndexSet<Permission> {
        &self.permissions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}
