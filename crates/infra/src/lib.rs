//! Infrastructure layer: persisted config and the game backend contract.

pub mod backend;
pub mod config;

pub use backend::{BackendError, BackendReply, BackendRequest, GameBackend, InMemoryBackend, PlayerSection};
pub use config::{ConfigError, ServerSettings};
