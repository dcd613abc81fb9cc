//! Per-route permission guard.
//!
//! Runs as a route layer, after authentication and before the handler, so a
//! denied request never reaches the backend.

use axum::{
    extract::{Request, State},
    middleware::{Next, from_fn_with_state},
    response::Response,
    routing::MethodRouter,
};

use arenagate_auth::{Permission, RouteRequirement, authorize};

use crate::app::errors;
use crate::context::CallerContext;

/// Protect `route` so that callers need at least one of `required`.
pub fn guarded(route: MethodRouter, required: impl IntoIterator<Item = Permission>) -> MethodRouter {
    route.route_layer(from_fn_with_state(RouteRequirement::any_of(required), require))
}

pub async fn require(State(required): State<RouteRequirement>, req: Request, next: Next) -> Response {
    let caller = req
        .extensions()
        .get::<CallerContext>()
        .cloned()
        .unwrap_or_default();

    if let Err(e) = authorize(&required, caller.permissions()) {
        tracing::debug!(
            method = %req.method(),
            path = %req.uri().path(),
            caller = caller.username().unwrap_or("-"),
            error = %e,
            "request denied"
        );
        return errors::unauthorized(&e);
    }

    next.run(req).await
}
