use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use arenagate_core::BridgeCall;
use arenagate_infra::{BackendError, BackendReply, BackendRequest, GameBackend};

use crate::app::errors::ApiError;

/// Handles shared by every request.
pub struct AppServices {
    backend: Arc<dyn GameBackend>,
    bridge_timeout: Option<Duration>,
}

impl AppServices {
    pub fn new(backend: Arc<dyn GameBackend>) -> Self {
        Self {
            backend,
            bridge_timeout: None,
        }
    }

    pub fn with_bridge_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.bridge_timeout = timeout;
        self
    }

    /// Submit `request` and wait for the backend's reply.
    ///
    /// The wait blocks a worker from tokio's blocking pool. If this future is
    /// dropped (client went away) the pending call is cancelled and the
    /// worker released.
    pub async fn query(&self, request: BackendRequest) -> Result<Value, ApiError> {
        let call = BridgeCall::<BackendReply>::new().with_timeout(self.bridge_timeout);
        let _cancel = call.canceller().cancel_on_drop();
        let backend = self.backend.clone();

        let reply = tokio::task::spawn_blocking(move || call.wait(move |done| backend.submit(request, done)))
            .await
            .map_err(|e| ApiError::Worker(e.to_string()))??;

        Ok(reply?)
    }

    /// Accept a UUID, or a player name looked up through the backend.
    pub async fn resolve_player(&self, raw: &str) -> Result<Uuid, ApiError> {
        if let Ok(uuid) = Uuid::parse_str(raw) {
            return Ok(uuid);
        }
        validate_player_name(raw)?;

        let reply = match self
            .query(BackendRequest::ResolvePlayer { name: raw.to_string() })
            .await
        {
            Ok(reply) => reply,
            Err(ApiError::Backend(BackendError::NotFound(_))) => {
                return Err(ApiError::bad_request(format!("no player named '{raw}' found")));
            }
            Err(e) => return Err(e),
        };

        reply
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| BackendError::Unavailable("backend returned a malformed uuid".to_string()).into())
    }
}

fn validate_player_name(name: &str) -> Result<(), ApiError> {
    if !(3..=16).contains(&name.len()) || !name.bytes().all(|b| (33..=126).contains(&b)) {
        return Err(ApiError::bad_request("player must be a uuid or a valid player name"));
    }
    Ok(())
}
