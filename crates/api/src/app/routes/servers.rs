use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    routing::get,
};
use serde_json::Value;

use arenagate_auth::permissions::SERVERS_READ;
use arenagate_infra::BackendRequest;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::guarded;

pub fn router() -> Router {
    Router::new()
        .route("/", guarded(get(list_servers), [SERVERS_READ]))
        .route("/:channel", guarded(get(get_server), [SERVERS_READ]))
}

pub async fn list_servers(Extension(services): Extension<Arc<AppServices>>) -> Result<Json<Value>, ApiError> {
    services.query(BackendRequest::Servers).await.map(Json)
}

pub async fn get_server(
    Extension(services): Extension<Arc<AppServices>>,
    Path(channel): Path<String>,
) -> Result<Json<Value>, ApiError> {
    services.query(BackendRequest::Server { channel }).await.map(Json)
}
