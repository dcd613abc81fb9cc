//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend access through the async bridge
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: query parameters and response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use arenagate_auth::CredentialStore;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// `cors_origins` empty disables CORS; `"*"` allows any origin.
pub fn build_app(store: Arc<CredentialStore>, services: Arc<AppServices>, cors_origins: &[String]) -> Router {
    let auth_state = middleware::AuthState { store };

    // Authentication runs for every route; guards are attached per route.
    let app = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::authenticate,
            ))
            .layer(Extension(services)),
    );

    match cors_layer(cors_origins) {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::PATCH])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(Any));
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(layer.allow_origin(allowed))
}
