use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capability token required by a protected route (e.g. `"arenas.read"`).
///
/// Identifiers are lowercase, dot-separated segments. There is no wildcard:
/// a user holds exactly the permissions listed for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(Cow<'static, str>);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("permission identifier is empty")]
    Empty,

    #[error("permission '{0}' has an empty segment")]
    EmptySegment(String),

    #[error("permission '{0}' contains '{1}' (allowed: a-z, 0-9, '_', '-', '.')")]
    InvalidChar(String, char),
}

impl Permission {
    /// Build a permission from a compile-time identifier. Not validated.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Parse an identifier from untrusted input (config files).
    pub fn parse(name: impl Into<String>) -> Result<Self, PermissionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(PermissionError::Empty);
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.')))
        {
            return Err(PermissionError::InvalidChar(name, c));
        }
        if name.split('.').any(str::is_empty) {
            return Err(PermissionError::EmptySegment(name));
        }
        Ok(Self(Cow::Owned(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First segment of the identifier (`"players"` for `"players.stats.read"`).
    pub fn category(&self) -> &str {
        self.as_str().split('.').next().unwrap_or_default()
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.0.into_owned()
    }
}

pub const ARENAS_READ: Permission = Permission::from_static("arenas.read");
pub const SERVERS_READ: Permission = Permission::from_static("servers.read");
pub const PLAYERS_READ_ONLINE: Permission = Permission::from_static("players.read.online");

pub const PLAYERS_STATS_READ: Permission = Permission::from_static("players.stats.read");
pub const PLAYERS_STATS_READ_RANK: Permission = Permission::from_static("players.stats.read.rank");
pub const PLAYERS_STATS_READ_LEADERBOARD: Permission =
    Permission::from_static("players.stats.read.leaderboard");
pub const PLAYERS_STATS_READ_SETS: Permission = Permission::from_static("players.stats.read.sets");
pub const PLAYERS_STATS_WRITE: Permission = Permission::from_static("players.stats.write");

pub const PLAYERS_ACHIEVEMENTS_READ: Permission = Permission::from_static("players.achievements.read");
pub const PLAYERS_ACHIEVEMENTS_READ_TYPES: Permission =
    Permission::from_static("players.achievements.read.types");
pub const PLAYERS_ACHIEVEMENTS_WRITE: Permission = Permission::from_static("players.achievements.write");

pub const PLAYERS_PROPERTIES_READ: Permission = Permission::from_static("players.properties.read");
pub const PLAYERS_PROPERTIES_WRITE: Permission = Permission::from_static("players.properties.write");

/// Every built-in permission, in catalog order.
pub fn builtin() -> [Permission; 13] {
    [
        ARENAS_READ,
        SERVERS_READ,
        PLAYERS_READ_ONLINE,
        PLAYERS_STATS_READ,
        PLAYERS_STATS_READ_RANK,
        PLAYERS_STATS_READ_LEADERBOARD,
        PLAYERS_STATS_READ_SETS,
        PLAYERS_STATS_WRITE,
        PLAYERS_ACHIEVEMENTS_READ,
        PLAYERS_ACHIEVEMENTS_READ_TYPES,
        PLAYERS_ACHIEVEMENTS_WRITE,
        PLAYERS_PROPERTIES_READ,
        PLAYERS_PROPERTIES_WRITE,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parse_accepts_dotted_lowercase() {
        let p = Permission::parse("players.stats.write").unwrap();
        assert_eq!(p, PLAYERS_STATS_WRITE);
        assert_eq!(p.category(), "players");
    }

    #[test]
    fn parse_rejects_malformed_identifiers() {
        assert_eq!(Permission::parse(""), Err(PermissionError::Empty));
        assert!(matches!(
            Permission::parse("Arenas.Read"),
            Err(PermissionError::InvalidChar(_, 'A'))
        ));
        assert!(matches!(Permission::parse("*"), Err(PermissionError::InvalidChar(_, '*'))));
        assert!(matches!(
            Permission::parse("arenas..read"),
            Err(PermissionError::EmptySegment(_))
        ));
        assert!(matches!(
            Permission::parse(".arenas"),
            Err(PermissionError::EmptySegment(_))
        ));
    }

    #[test]
    fn builtin_identifiers_are_unique_and_well_formed() {
        let all = builtin();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());

        for p in &all {
            assert_eq!(Permission::parse(p.as_str()).as_ref(), Ok(p));
        }
    }

    #[test]
    fn serde_uses_plain_strings() {
        let json = serde_json::to_string(&ARENAS_READ).unwrap();
        assert_eq!(json, "\"arenas.read\"");

        let back: Permission = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ARENAS_READ);

        assert!(serde_json::from_str::<Permission>("\"NOPE\"").is_err());
    }
}
