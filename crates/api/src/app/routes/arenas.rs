use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    routing::get,
};
use serde_json::Value;

use arenagate_auth::permissions::ARENAS_READ;
use arenagate_infra::BackendRequest;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::guarded;

pub fn router() -> Router {
    Router::new()
        .route("/", guarded(get(list_arenas), [ARENAS_READ]))
        .route("/:rest_id", guarded(get(get_arena), [ARENAS_READ]))
}

pub async fn list_arenas(Extension(services): Extension<Arc<AppServices>>) -> Result<Json<Value>, ApiError> {
    services.query(BackendRequest::Arenas).await.map(Json)
}

pub async fn get_arena(
    Extension(services): Extension<Arc<AppServices>>,
    Path(rest_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    services.query(BackendRequest::Arena { rest_id }).await.map(Json)
}
