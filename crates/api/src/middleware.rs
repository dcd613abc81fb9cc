use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use arenagate_auth::{CredentialStore, Credentials, resolve_permissions};

use crate::context::CallerContext;

#[derive(Clone)]
pub struct AuthState {
    pub store: Arc<CredentialStore>,
}

/// Resolve the caller's permissions and attach them to the request.
///
/// Never rejects: missing or bad credentials yield an anonymous caller, and
/// the route guard decides whether that is enough.
pub async fn authenticate(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let credentials = basic_credentials(req.headers());
    let resolved = resolve_permissions(&state.store, credentials.as_ref());

    req.extensions_mut().insert(CallerContext::new(resolved));
    next.run(req).await
}

fn basic_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    Credentials::from_basic_header(header)
}
