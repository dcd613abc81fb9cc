//! Who may call which route.
//!
//! Pure in-memory policy: no HTTP types, no file IO. The API layer extracts
//! [`Credentials`] from requests, the infra layer fills the
//! [`CredentialStore`] from the persisted config.

pub mod authorize;
pub mod credentials;
pub mod permissions;
pub mod registry;
pub mod secret;
pub mod store;
pub mod user;

pub use authorize::{AuthzError, EffectivePermissions, RouteRequirement, authorize, resolve_permissions};
pub use credentials::{BASIC_SCHEME, Credentials};
pub use permissions::{Permission, PermissionError};
pub use registry::{PermissionRegistry, PermissionRegistryBuilder};
pub use secret::Secret;
pub use store::{CredentialStore, DEFAULT_USERNAME};
pub use user::{User, UserError};
