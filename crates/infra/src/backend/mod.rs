//! Contract with the game backend.
//!
//! The backend is callback-shaped: it accepts a request together with a
//! [`Completion`] and delivers the reply later, possibly from another thread.
//! Payloads are opaque JSON; this crate does not model servers, arenas or
//! players beyond what the in-memory backend needs to answer requests.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use arenagate_core::Completion;

pub mod in_memory;

pub use in_memory::{Dataset, InMemoryBackend, PlayerRecord};

pub type BackendReply = Result<Value, BackendError>;

/// Per-player data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSection {
    Stats,
    Achievements,
    Properties,
}

impl PlayerSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerSection::Stats => "stats",
            PlayerSection::Achievements => "achievements",
            PlayerSection::Properties => "properties",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendRequest {
    Servers,
    Server {
        channel: String,
    },
    Arenas,
    Arena {
        rest_id: String,
    },
    OnlinePlayers,
    OnlinePlayer {
        uuid: Uuid,
    },
    /// Look a player up by name; replies with the UUID as a JSON string.
    ResolvePlayer {
        name: String,
    },
    Player {
        section: PlayerSection,
        uuid: Uuid,
    },
    /// Merge `entries` into the section, or replace it when `replace_all`.
    UpdatePlayer {
        section: PlayerSection,
        uuid: Uuid,
        entries: Map<String, Value>,
        replace_all: bool,
    },
    StatSets,
    AchievementTypes,
    LeaderboardPosition {
        uuid: Uuid,
        stat_set: String,
    },
    Leaderboard {
        stat_set: String,
        min_pos: u32,
        max_pos: u32,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// A callback-completing game backend.
///
/// Implementations must eventually call `done.deliver(..)` exactly once, from
/// any thread. Dropping `done` without delivering fails the waiting request.
pub trait GameBackend: Send + Sync {
    fn submit(&self, request: BackendRequest, done: Completion<BackendReply>);
}

impl<B> GameBackend for Arc<B>
where
    B: GameBackend + ?Sized,
{
    fn submit(&self, request: BackendRequest, done: Completion<BackendReply>) {
        (**self).submit(request, done)
    }
}
