use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use arenagate_api::app::{build_app, services::AppServices};
use arenagate_auth::{CredentialStore, PermissionRegistry};
use arenagate_infra::backend::{Dataset, GameBackend, InMemoryBackend};
use arenagate_infra::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    arenagate_observability::init();

    let config_path = PathBuf::from(
        std::env::var("ARENAGATE_CONFIG").unwrap_or_else(|_| "configs.json".to_string()),
    );

    let registry = Arc::new(PermissionRegistry::builtin());
    let store = Arc::new(CredentialStore::new());
    let settings = config::load_or_init(&config_path, &store, &registry)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let dataset = match std::env::var("ARENAGATE_DATASET") {
        Ok(path) => load_dataset(Path::new(&path))?,
        Err(_) => {
            tracing::warn!("ARENAGATE_DATASET not set; serving the built-in sample data");
            Dataset::sample()
        }
    };
    let backend: Arc<dyn GameBackend> = Arc::new(InMemoryBackend::new(dataset));
    let services = Arc::new(AppServices::new(backend).with_bridge_timeout(settings.backend_timeout()));

    #[cfg(unix)]
    reload_on_hangup(config_path.clone(), store.clone(), registry.clone())?;

    let app = build_app(store.clone(), services, &settings.allowed_cors_origins);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr()))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        users = store.len(),
        permissions = registry.len(),
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid dataset {}", path.display()))
}

/// Re-read the users section of the config whenever the process gets SIGHUP.
#[cfg(unix)]
fn reload_on_hangup(
    path: PathBuf,
    store: Arc<CredentialStore>,
    registry: Arc<PermissionRegistry>,
) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;

    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            let (path, store, registry) = (path.clone(), store.clone(), registry.clone());
            let result = tokio::task::spawn_blocking(move || config::reload(&path, &store, &registry)).await;

            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "config reload failed; keeping current users"),
                Err(e) => tracing::error!(error = %e, "config reload task failed"),
            }
        }
    });

    Ok(())
}
