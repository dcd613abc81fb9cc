use axum::{Extension, Json};

use crate::app::dto::HelloResponse;
use crate::context::CallerContext;

const MOTD: &str = "Hello world! The arenagate REST server is up and running.";

/// Open to everyone; echoes what the caller is allowed to do.
pub async fn hello(Extension(caller): Extension<CallerContext>) -> Json<HelloResponse> {
    Json(HelloResponse {
        motd: MOTD,
        version: env!("CARGO_PKG_VERSION"),
        authenticated_user: caller.username().map(str::to_string),
        authenticated_user_permissions: caller
            .permissions()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
    })
}
