use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    routing::{get, patch},
};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};

use arenagate_auth::permissions::{
    PLAYERS_ACHIEVEMENTS_READ, PLAYERS_ACHIEVEMENTS_READ_TYPES, PLAYERS_ACHIEVEMENTS_WRITE,
    PLAYERS_PROPERTIES_READ, PLAYERS_PROPERTIES_WRITE, PLAYERS_READ_ONLINE, PLAYERS_STATS_READ,
    PLAYERS_STATS_READ_LEADERBOARD, PLAYERS_STATS_READ_RANK, PLAYERS_STATS_READ_SETS,
    PLAYERS_STATS_WRITE,
};
use arenagate_infra::{BackendError, BackendRequest, PlayerSection};

use crate::app::dto::{LeaderboardQuery, StatSetsQuery, UpdateQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::guarded;

pub fn router() -> Router {
    Router::new()
        .route("/online", guarded(get(online_players), [PLAYERS_READ_ONLINE]))
        .route("/online/:player", guarded(get(online_player), [PLAYERS_READ_ONLINE]))
        .route("/stats/:player", guarded(get(get_stats), [PLAYERS_STATS_READ]))
        .route("/stats/:player", guarded(patch(update_stats), [PLAYERS_STATS_WRITE]))
        .route(
            "/stats/:player/leaderboard",
            guarded(get(leaderboard_positions), [PLAYERS_STATS_READ_RANK]),
        )
        .route("/stat-sets", guarded(get(stat_sets), [PLAYERS_STATS_READ_SETS]))
        .route(
            "/stats-leaderboard",
            guarded(get(leaderboard), [PLAYERS_STATS_READ_LEADERBOARD]),
        )
        .route("/achievements/:player", guarded(get(get_achievements), [PLAYERS_ACHIEVEMENTS_READ]))
        .route(
            "/achievements/:player",
            guarded(patch(update_achievements), [PLAYERS_ACHIEVEMENTS_WRITE]),
        )
        .route(
            "/achievement-types",
            guarded(get(achievement_types), [PLAYERS_ACHIEVEMENTS_READ_TYPES]),
        )
        .route("/properties/:player", guarded(get(get_properties), [PLAYERS_PROPERTIES_READ]))
        .route(
            "/properties/:player",
            guarded(patch(update_properties), [PLAYERS_PROPERTIES_WRITE]),
        )
}

type Reply = Result<Json<Value>, ApiError>;

// ─────────────────────────────────────────────────────────────────────────────
// Online players
// ─────────────────────────────────────────────────────────────────────────────

pub async fn online_players(Extension(services): Extension<Arc<AppServices>>) -> Reply {
    services.query(BackendRequest::OnlinePlayers).await.map(Json)
}

pub async fn online_player(
    Extension(services): Extension<Arc<AppServices>>,
    Path(player): Path<String>,
) -> Reply {
    let uuid = services.resolve_player(&player).await?;
    services.query(BackendRequest::OnlinePlayer { uuid }).await.map(Json)
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-player sections
// ─────────────────────────────────────────────────────────────────────────────

async fn read_section(services: &AppServices, player: &str, section: PlayerSection) -> Reply {
    let uuid = services.resolve_player(player).await?;
    services.query(BackendRequest::Player { section, uuid }).await.map(Json)
}

async fn write_section(
    services: &AppServices,
    player: &str,
    section: PlayerSection,
    query: UpdateQuery,
    entries: Map<String, Value>,
) -> Reply {
    let uuid = services.resolve_player(player).await?;
    let updated = services
        .query(BackendRequest::UpdatePlayer {
            section,
            uuid,
            entries,
            replace_all: query.replace_all,
        })
        .await?;

    tracing::info!(
        section = section.as_str(),
        player = %uuid,
        replace_all = query.replace_all,
        "player data updated"
    );
    Ok(Json(updated))
}

pub async fn get_stats(Extension(services): Extension<Arc<AppServices>>, Path(player): Path<String>) -> Reply {
    read_section(&services, &player, PlayerSection::Stats).await
}

pub async fn update_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Path(player): Path<String>,
    Query(query): Query<UpdateQuery>,
    Json(entries): Json<Map<String, Value>>,
) -> Reply {
    write_section(&services, &player, PlayerSection::Stats, query, entries).await
}

pub async fn get_achievements(
    Extension(services): Extension<Arc<AppServices>>,
    Path(player): Path<String>,
) -> Reply {
    read_section(&services, &player, PlayerSection::Achievements).await
}

pub async fn update_achievements(
    Extension(services): Extension<Arc<AppServices>>,
    Path(player): Path<String>,
    Query(query): Query<UpdateQuery>,
    Json(entries): Json<Map<String, Value>>,
) -> Reply {
    write_section(&services, &player, PlayerSection::Achievements, query, entries).await
}

pub async fn get_properties(
    Extension(services): Extension<Arc<AppServices>>,
    Path(player): Path<String>,
) -> Reply {
    read_section(&services, &player, PlayerSection::Properties).await
}

pub async fn update_properties(
    Extension(services): Extension<Arc<AppServices>>,
    Path(player): Path<String>,
    Query(query): Query<UpdateQuery>,
    Json(entries): Json<Map<String, Value>>,
) -> Reply {
    write_section(&services, &player, PlayerSection::Properties, query, entries).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalogs and leaderboards
// ─────────────────────────────────────────────────────────────────────────────

pub async fn stat_sets(Extension(services): Extension<Arc<AppServices>>) -> Reply {
    services.query(BackendRequest::StatSets).await.map(Json)
}

pub async fn achievement_types(Extension(services): Extension<Arc<AppServices>>) -> Reply {
    services.query(BackendRequest::AchievementTypes).await.map(Json)
}

/// Reject unknown stat set ids before any ranking is fetched.
async fn ensure_stat_sets(services: &AppServices, ids: &[String]) -> Result<(), ApiError> {
    let registered = services.query(BackendRequest::StatSets).await?;
    let registered: Vec<&str> = registered
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect();

    match ids.iter().find(|id| !registered.contains(&id.as_str())) {
        Some(id) => Err(ApiError::bad_request(format!("Stat set with id '{id}' does not exist"))),
        None => Ok(()),
    }
}

/// Rank of one player in each requested stat set; `null` when unranked.
pub async fn leaderboard_positions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(player): Path<String>,
    Query(query): Query<StatSetsQuery>,
) -> Reply {
    let stat_sets = query.stat_sets()?;
    ensure_stat_sets(&services, &stat_sets).await?;
    let uuid = services.resolve_player(&player).await?;

    let mut positions = Map::new();
    for stat_set in stat_sets {
        let position = match services
            .query(BackendRequest::LeaderboardPosition {
                uuid,
                stat_set: stat_set.clone(),
            })
            .await
        {
            Ok(position) => position,
            Err(ApiError::Backend(BackendError::NotFound(_))) => Value::Null,
            Err(e) => return Err(e),
        };
        positions.insert(stat_set, position);
    }

    Ok(Json(json!({
        "playerUUID": uuid.to_string(),
        "leaderboardPositions": positions,
    })))
}

/// Players ranked within `minPos..=maxPos` of any requested stat set.
///
/// One entry per player, carrying their position in each set they appear in.
/// Positions with no player are simply absent.
pub async fn leaderboard(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<LeaderboardQuery>,
) -> Reply {
    let window = query.validate()?;
    ensure_stat_sets(&services, &window.stat_sets).await?;
    let mut players: IndexMap<String, Value> = IndexMap::new();

    for stat_set in &window.stat_sets {
        let rows = services
            .query(BackendRequest::Leaderboard {
                stat_set: stat_set.clone(),
                min_pos: window.min_pos,
                max_pos: window.max_pos,
            })
            .await?;

        for row in rows.as_array().into_iter().flatten() {
            let Some(uuid) = row["uuid"].as_str() else {
                continue;
            };
            let entry = players.entry(uuid.to_string()).or_insert_with(|| {
                json!({
                    "playerUUID": uuid,
                    "name": row["name"],
                    "leaderboardPositions": {},
                    "stats": row["stats"],
                })
            });
            entry["leaderboardPositions"][stat_set.as_str()] = row["position"].clone();
        }
    }

    Ok(Json(Value::Array(players.into_values().collect())))
}
