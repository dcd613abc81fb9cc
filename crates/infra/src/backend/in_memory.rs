//! In-memory game backend for tests/dev.
//!
//! Every request is answered on a freshly spawned worker thread (after an
//! optional artificial latency), mirroring how the real game delivers results
//! from its own threads rather than the caller's.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use arenagate_core::Completion;

use super::{BackendError, BackendReply, BackendRequest, GameBackend, PlayerSection};

/// Backing data for [`InMemoryBackend`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Dataset {
    /// Server descriptors, keyed by their `channelName` field.
    pub servers: Vec<Value>,
    /// Arena descriptors, keyed by their `restId` field.
    pub arenas: Vec<Value>,
    pub online_players: Vec<Uuid>,
    pub players: HashMap<Uuid, PlayerRecord>,
    pub stat_sets: Vec<String>,
    pub achievement_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerRecord {
    pub name: String,
    pub stats: Map<String, Value>,
    pub achievements: Map<String, Value>,
    pub properties: Map<String, Value>,
}

impl PlayerRecord {
    fn section(&self, section: PlayerSection) -> &Map<String, Value> {
        match section {
            PlayerSection::Stats => &self.stats,
            PlayerSection::Achievements => &self.achievements,
            PlayerSection::Properties => &self.properties,
        }
    }

    fn section_mut(&mut self, section: PlayerSection) -> &mut Map<String, Value> {
        match section {
            PlayerSection::Stats => &mut self.stats,
            PlayerSection::Achievements => &mut self.achievements,
            PlayerSection::Properties => &mut self.properties,
        }
    }
}

impl Dataset {
    /// Small demo dataset used by the binary when no real backend is wired in.
    pub fn sample() -> Self {
        let alice = Uuid::from_u128(0x6f1c_2d43_0f8e_4a51_9c1e_3b7a_0d52_e001);
        let bob = Uuid::from_u128(0x6f1c_2d43_0f8e_4a51_9c1e_3b7a_0d52_e002);

        let mut players = HashMap::new();
        players.insert(
            alice,
            PlayerRecord {
                name: "Alice".to_string(),
                stats: stats(&[("bedwars:wins", 42.0), ("bedwars:kills", 310.0)]),
                achievements: Map::from_iter([("first_win".to_string(), json!(true))]),
                properties: Map::from_iter([("language".to_string(), json!("en"))]),
            },
        );
        players.insert(
            bob,
            PlayerRecord {
                name: "Bob".to_string(),
                stats: stats(&[("bedwars:wins", 17.0), ("bedwars:kills", 512.0)]),
                ..Default::default()
            },
        );

        Self {
            servers: vec![
                json!({ "channelName": "lobby-1", "status": "online", "players": 12 }),
                json!({ "channelName": "game-1", "status": "ingame", "players": 8 }),
            ],
            arenas: vec![
                json!({ "restId": "castle", "status": "lobby", "players": 3, "maxPlayers": 8 }),
                json!({ "restId": "islands", "status": "running", "players": 8, "maxPlayers": 8 }),
            ],
            online_players: vec![alice],
            players,
            stat_sets: vec!["bedwars:wins".to_string(), "bedwars:kills".to_string()],
            achievement_types: vec!["first_win".to_string(), "bed_breaker".to_string()],
        }
    }

    fn query(&self, request: BackendRequest) -> BackendReply {
        match request {
            BackendRequest::Servers => Ok(Value::Array(self.servers.clone())),
            BackendRequest::Server { channel } => find_by(&self.servers, "channelName", &channel)
                .ok_or_else(|| not_found("No server under the given channelName found")),
            BackendRequest::Arenas => Ok(Value::Array(self.arenas.clone())),
            BackendRequest::Arena { rest_id } => find_by(&self.arenas, "restId", &rest_id)
                .ok_or_else(|| not_found("No arena under the given restId found")),
            BackendRequest::OnlinePlayers => Ok(Value::Array(
                self.online_players.iter().map(|u| self.online_player(*u)).collect(),
            )),
            BackendRequest::OnlinePlayer { uuid } => {
                if self.online_players.contains(&uuid) {
                    Ok(self.online_player(uuid))
                } else {
                    Err(not_found("Player not online"))
                }
            }
            BackendRequest::ResolvePlayer { name } => self
                .players
                .iter()
                .find(|(_, p)| p.name.eq_ignore_ascii_case(&name))
                .map(|(uuid, _)| Value::String(uuid.to_string()))
                .ok_or_else(|| not_found("no player with that name found")),
            BackendRequest::Player { section, uuid } => Ok(self.section_json(section, uuid)),
            BackendRequest::StatSets => Ok(json!(self.stat_sets)),
            BackendRequest::AchievementTypes => Ok(json!(self.achievement_types)),
            BackendRequest::LeaderboardPosition { uuid, stat_set } => {
                self.ensure_stat_set(&stat_set)?;
                self.ranking(&stat_set)
                    .iter()
                    .position(|(u, _)| *u == uuid)
                    .map(|i| json!(i + 1))
                    .ok_or_else(|| not_found(format!("player has no rank in '{stat_set}'")))
            }
            BackendRequest::Leaderboard {
                stat_set,
                min_pos,
                max_pos,
            } => {
                self.ensure_stat_set(&stat_set)?;
                if min_pos < 1 || max_pos < min_pos {
                    return Err(BackendError::Invalid(format!(
                        "invalid rank range {min_pos}..={max_pos}"
                    )));
                }

                let ranking = self.ranking(&stat_set);
                let last = max_pos.min(u32::try_from(ranking.len()).unwrap_or(u32::MAX));
                let rows = (min_pos..=last)
                    .filter_map(|pos| {
                        let (uuid, _) = ranking.get(pos as usize - 1)?;
                        let record = self.players.get(uuid)?;
                        Some(json!({
                            "position": pos,
                            "uuid": uuid.to_string(),
                            "name": record.name,
                            "stats": record.stats,
                        }))
                    })
                    .collect();
                Ok(Value::Array(rows))
            }
            BackendRequest::UpdatePlayer { .. } => Err(BackendError::Invalid(
                "updates must go through the write path".to_string(),
            )),
        }
    }

    fn update(
        &mut self,
        section: PlayerSection,
        uuid: Uuid,
        entries: Map<String, Value>,
        replace_all: bool,
    ) -> BackendReply {
        self.validate_entries(section, &entries)?;

        let target = self.players.entry(uuid).or_default().section_mut(section);
        if replace_all {
            target.clear();
        }
        target.extend(entries);

        Ok(self.section_json(section, uuid))
    }

    fn validate_entries(
        &self,
        section: PlayerSection,
        entries: &Map<String, Value>,
    ) -> Result<(), BackendError> {
        for (key, value) in entries {
            match section {
                PlayerSection::Stats if !value.is_number() => {
                    return Err(BackendError::Invalid(format!("stat '{key}' must be a number")));
                }
                PlayerSection::Properties if !value.is_string() => {
                    return Err(BackendError::Invalid(format!(
                        "property '{key}' must be a string"
                    )));
                }
                PlayerSection::Achievements if !self.achievement_types.contains(key) => {
                    return Err(not_found(format!("No achievement with id exists: {key}")));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn section_json(&self, section: PlayerSection, uuid: Uuid) -> Value {
        let entries = self
            .players
            .get(&uuid)
            .map(|p| p.section(section).clone())
            .unwrap_or_default();

        let mut out = Map::new();
        out.insert("uuid".to_string(), Value::String(uuid.to_string()));
        out.insert(section.as_str().to_string(), Value::Object(entries));
        Value::Object(out)
    }

    fn online_player(&self, uuid: Uuid) -> Value {
        let name = self.players.get(&uuid).map(|p| p.name.as_str()).unwrap_or_default();
        json!({ "uuid": uuid.to_string(), "name": name })
    }

    fn ensure_stat_set(&self, id: &str) -> Result<(), BackendError> {
        if self.stat_sets.iter().any(|s| s == id) {
            Ok(())
        } else {
            Err(BackendError::Invalid(format!("Stat set with id '{id}' does not exist")))
        }
    }

    /// Players holding the stat, best first. Ties break on UUID for stable ranks.
    fn ranking(&self, stat_set: &str) -> Vec<(Uuid, f64)> {
        let mut ranked: Vec<(Uuid, f64)> = self
            .players
            .iter()
            .filter_map(|(uuid, p)| Some((*uuid, p.stats.get(stat_set)?.as_f64()?)))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }
}

fn stats(pairs: &[(&str, f64)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect()
}

fn find_by(items: &[Value], field: &str, id: &str) -> Option<Value> {
    items
        .iter()
        .find(|v| v.get(field).and_then(Value::as_str) == Some(id))
        .cloned()
}

fn not_found(msg: impl Into<String>) -> BackendError {
    BackendError::NotFound(msg.into())
}

/// Callback-style backend over a shared [`Dataset`].
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Dataset>>,
    latency: Duration,
}

impl InMemoryBackend {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            data: Arc::new(RwLock::new(dataset)),
            latency: Duration::ZERO,
        }
    }

    /// Delay every reply by `latency` (simulates a slow database).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Copy of the current data.
    pub fn snapshot(&self) -> Dataset {
        match self.data.read() {
            Ok(d) => d.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }
}

fn handle(data: &RwLock<Dataset>, request: BackendRequest) -> BackendReply {
    let poisoned = || BackendError::Unavailable("dataset lock poisoned".to_string());

    match request {
        BackendRequest::UpdatePlayer {
            section,
            uuid,
            entries,
            replace_all,
        } => data
            .write()
            .map_err(|_| poisoned())?
            .update(section, uuid, entries, replace_all),
        other => data.read().map_err(|_| poisoned())?.query(other),
    }
}

impl GameBackend for InMemoryBackend {
    fn submit(&self, request: BackendRequest, done: Completion<BackendReply>) {
        let data = self.data.clone();
        let latency = self.latency;

        let spawned = thread::Builder::new()
            .name("backend-worker".to_string())
            .spawn(move || {
                if !latency.is_zero() {
                    thread::sleep(latency);
                }
                done.deliver(handle(&data, request));
            });

        // On failure the closure, and with it `done`, is dropped: the waiter
        // sees the call as abandoned.
        if let Err(e) = spawned {
            tracing::error!("failed to spawn backend worker: {e}");
        }
    }
}
