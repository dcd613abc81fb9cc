use axum::{Router, routing::get};

pub mod arenas;
pub mod players;
pub mod servers;
pub mod system;

/// Router for every endpoint. Protected routes carry their own guard.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::hello))
        .nest("/servers", servers::router())
        .nest("/arenas", arenas::router())
        .nest("/players", players::router())
}
