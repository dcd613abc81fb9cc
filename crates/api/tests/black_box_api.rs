use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde_json::{Value, json};

use arenagate_api::app::{build_app, services::AppServices};
use arenagate_auth::permissions::{
    ARENAS_READ, PLAYERS_ACHIEVEMENTS_WRITE, PLAYERS_STATS_READ, PLAYERS_STATS_READ_LEADERBOARD,
    PLAYERS_STATS_READ_RANK, PLAYERS_STATS_WRITE, SERVERS_READ,
};
use arenagate_auth::{CredentialStore, Permission, PermissionRegistry, Secret, User};
use arenagate_core::Completion;
use arenagate_infra::backend::{BackendReply, BackendRequest, Dataset, GameBackend, InMemoryBackend};

const ALICE: &str = "6f1c2d43-0f8e-4a51-9c1e-3b7a0d52e001";

/// Forwards to the in-memory backend and counts what reaches it.
struct RecordingBackend {
    inner: InMemoryBackend,
    submitted: AtomicUsize,
}

impl GameBackend for RecordingBackend {
    fn submit(&self, request: BackendRequest, done: Completion<BackendReply>) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.inner.submit(request, done)
    }
}

struct TestServer {
    base_url: String,
    backend: Arc<RecordingBackend>,
    store: Arc<CredentialStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with_cors(&[]).await
    }

    async fn spawn_with_cors(cors_origins: &[&str]) -> Self {
        let store = Arc::new(CredentialStore::new());
        let backend = Arc::new(RecordingBackend {
            inner: InMemoryBackend::new(Dataset::sample()),
            submitted: AtomicUsize::new(0),
        });
        let services = Arc::new(AppServices::new(backend.clone()));
        let origins: Vec<String> = cors_origins.iter().map(|s| s.to_string()).collect();

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(store.clone(), services, &origins);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            backend,
            store,
            handle,
        }
    }

    fn add_user(&self, username: &str, secret: &str, permissions: impl IntoIterator<Item = Permission>) {
        self.store
            .upsert(User::new(username, Secret::new(secret), permissions).unwrap());
    }

    fn backend_calls(&self) -> usize {
        self.backend.submitted.load(Ordering::SeqCst)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn basic(username: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{secret}")))
}

#[tokio::test]
async fn hello_is_open_to_anonymous_callers() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert!(body["motd"].as_str().is_some());
    assert_eq!(body["authenticatedUserPermissions"], json!([]));
    assert_eq!(srv.backend_calls(), 0);
}

#[tokio::test]
async fn hello_lists_the_callers_permissions() {
    let srv = TestServer::spawn().await;
    srv.add_user("admin", "s3cret", [ARENAS_READ]);

    let res = reqwest::Client::new()
        .get(srv.url("/"))
        .header("Authorization", basic("admin", "s3cret"))
        .send()
        .await
        .unwrap();

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["authenticatedUser"], "admin");
    assert_eq!(body["authenticatedUserPermissions"], json!(["arenas.read"]));
}

#[tokio::test]
async fn protected_route_challenges_anonymous_callers_without_touching_backend() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/arenas")).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "Basic");

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(srv.backend_calls(), 0);
}

#[tokio::test]
async fn scenario_admin_with_arenas_read() {
    let srv = TestServer::spawn().await;
    srv.add_user("admin", "s3cret", [ARENAS_READ]);
    let client = reqwest::Client::new();

    let ok = client
        .get(srv.url("/arenas"))
        .header("Authorization", basic("admin", "s3cret"))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let arenas: Value = ok.json().await.unwrap();
    assert_eq!(arenas.as_array().unwrap().len(), 2);

    let wrong_secret = client
        .get(srv.url("/arenas"))
        .header("Authorization", basic("admin", "wrong"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_secret.status(), StatusCode::UNAUTHORIZED);

    let calls_before = srv.backend_calls();
    let missing_permission = client
        .get(srv.url("/servers"))
        .header("Authorization", basic("admin", "s3cret"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_permission.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing_permission.headers()["www-authenticate"], "Basic");
    assert_eq!(srv.backend_calls(), calls_before);
}

#[tokio::test]
async fn username_is_case_insensitive() {
    let srv = TestServer::spawn().await;
    srv.add_user("admin", "s3cret", [SERVERS_READ]);

    let res = reqwest::Client::new()
        .get(srv.url("/servers/lobby-1"))
        .header("Authorization", basic("ADMIN", "s3cret"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["channelName"], "lobby-1");
}

#[tokio::test]
async fn read_and_write_permissions_are_separate() {
    let srv = TestServer::spawn().await;
    srv.add_user("reader", "pw", [PLAYERS_STATS_READ]);
    srv.add_user("writer", "pw", [PLAYERS_STATS_WRITE]);
    let client = reqwest::Client::new();
    let path = format!("/players/stats/{ALICE}");

    let read = client
        .get(srv.url(&path))
        .header("Authorization", basic("reader", "pw"))
        .send()
        .await
        .unwrap();
    assert_eq!(read.status(), StatusCode::OK);

    let denied_write = client
        .patch(srv.url(&path))
        .header("Authorization", basic("reader", "pw"))
        .json(&json!({ "bedwars:wins": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied_write.status(), StatusCode::UNAUTHORIZED);

    let write = client
        .patch(srv.url(&path))
        .header("Authorization", basic("writer", "pw"))
        .json(&json!({ "bedwars:wins": 43 }))
        .send()
        .await
        .unwrap();
    assert_eq!(write.status(), StatusCode::OK);
    let body: Value = write.json().await.unwrap();
    assert_eq!(body["stats"]["bedwars:wins"], 43);
    assert_eq!(body["stats"]["bedwars:kills"], 310.0);
}

#[tokio::test]
async fn replace_all_drops_unlisted_entries() {
    let srv = TestServer::spawn().await;
    srv.add_user("writer", "pw", [PLAYERS_STATS_WRITE]);

    let res = reqwest::Client::new()
        .patch(srv.url(&format!("/players/stats/{ALICE}?replaceAll=true")))
        .header("Authorization", basic("writer", "pw"))
        .json(&json!({ "bedwars:wins": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["stats"], json!({ "bedwars:wins": 1 }));
}

#[tokio::test]
async fn unknown_achievement_is_not_found() {
    let srv = TestServer::spawn().await;
    srv.add_user("writer", "pw", [PLAYERS_ACHIEVEMENTS_WRITE]);

    let res = reqwest::Client::new()
        .patch(srv.url(&format!("/players/achievements/{ALICE}")))
        .header("Authorization", basic("writer", "pw"))
        .json(&json!({ "no_such_achievement": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn players_may_be_addressed_by_name() {
    let srv = TestServer::spawn().await;
    srv.add_user("reader", "pw", [PLAYERS_STATS_READ]);
    let client = reqwest::Client::new();

    let by_name = client
        .get(srv.url("/players/stats/Alice"))
        .header("Authorization", basic("reader", "pw"))
        .send()
        .await
        .unwrap();
    assert_eq!(by_name.status(), StatusCode::OK);

    let unknown = client
        .get(srv.url("/players/stats/Nobody"))
        .header("Authorization", basic("reader", "pw"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn leaderboard_query_is_validated() {
    let srv = TestServer::spawn().await;
    srv.add_user("ranker", "pw", [PLAYERS_STATS_READ_LEADERBOARD, PLAYERS_STATS_READ_RANK]);
    let client = reqwest::Client::new();

    for query in [
        "",
        "?statSets=",
        "?statSets=bedwars:wins&minPos=0&maxPos=3",
        "?statSets=bedwars:wins&minPos=3&maxPos=2",
        "?statSets=nope&minPos=1&maxPos=3",
    ] {
        let res = client
            .get(srv.url(&format!("/players/stats-leaderboard{query}")))
            .header("Authorization", basic("ranker", "pw"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "query {query:?}");
    }

    let res = client
        .get(srv.url("/players/stats-leaderboard?statSets=bedwars:wins,bedwars:kills&minPos=1&maxPos=10"))
        .header("Authorization", basic("ranker", "pw"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let players: Value = res.json().await.unwrap();
    let players = players.as_array().unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0]["playerUUID"], ALICE);
    assert_eq!(players[0]["leaderboardPositions"]["bedwars:wins"], 1);
    assert_eq!(players[0]["leaderboardPositions"]["bedwars:kills"], 2);

    let ranks = client
        .get(srv.url(&format!("/players/stats/{ALICE}/leaderboard?statSets=bedwars:kills")))
        .header("Authorization", basic("ranker", "pw"))
        .send()
        .await
        .unwrap();
    assert_eq!(ranks.status(), StatusCode::OK);
    let body: Value = ranks.json().await.unwrap();
    assert_eq!(body["leaderboardPositions"]["bedwars:kills"], 2);
}

#[tokio::test]
async fn unknown_stat_set_is_rejected_before_any_ranking_is_fetched() {
    let srv = TestServer::spawn().await;
    srv.add_user("ranker", "pw", [PLAYERS_STATS_READ_LEADERBOARD, PLAYERS_STATS_READ_RANK]);
    let client = reqwest::Client::new();

    for path in [
        format!("/players/stats/{ALICE}/leaderboard?statSets=bedwars:wins,nope"),
        "/players/stats-leaderboard?statSets=bedwars:wins,nope&minPos=1&maxPos=3".to_string(),
    ] {
        let before = srv.backend_calls();
        let res = client
            .get(srv.url(&path))
            .header("Authorization", basic("ranker", "pw"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "GET {path}");

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Stat set with id 'nope' does not exist");
        // Only the stat set catalogue was consulted.
        assert_eq!(srv.backend_calls(), before + 1, "GET {path}");
    }
}

#[tokio::test]
async fn default_user_reaches_every_route() {
    let srv = TestServer::spawn().await;
    let seeded = srv.store.seed_default(&PermissionRegistry::builtin());
    let auth = basic("default", seeded.secret().expose());
    let client = reqwest::Client::new();

    for path in [
        "/servers".to_string(),
        "/arenas".to_string(),
        "/players/online".to_string(),
        format!("/players/stats/{ALICE}"),
        "/players/stat-sets".to_string(),
        format!("/players/achievements/{ALICE}"),
        "/players/achievement-types".to_string(),
        format!("/players/properties/{ALICE}"),
    ] {
        let res = client
            .get(srv.url(&path))
            .header("Authorization", auth.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "GET {path}");
    }
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let srv = TestServer::spawn_with_cors(&["*"]).await;

    let res = reqwest::Client::new()
        .get(srv.url("/"))
        .header("Origin", "https://example.org")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
}
