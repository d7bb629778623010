//! orgbridge server entry point.

use std::sync::Arc;

use orgbridge::auth::{IdentityProvider, RestIdentityProvider};
use orgbridge::directory::FirestoreDirectory;
use orgbridge::http::{AppState, build_router};
use orgbridge::lookup::HybridLookup;
use orgbridge::projects::SeaOrmProjectStore;
use orgbridge::provisioning::Provisioner;
use orgbridge::ConfigBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigBuilder::new().from_env().build()?;
    orgbridge::init_tracing_with_config(&config.logging);

    tracing::info!("Starting orgbridge");

    // Clients are constructed once and shared by reference across
    // concurrent invocations; none of them hold per-request state.
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(RestIdentityProvider::from_config(&config.auth).await?);
    let directory = Arc::new(FirestoreDirectory::from_config(&config.directory)?);
    let projects = Arc::new(SeaOrmProjectStore::from_config(&config.database).await?);

    let state = AppState {
        provisioner: Arc::new(Provisioner::new(directory.clone(), identity.clone())),
        lookup: Arc::new(HybridLookup::new(directory, projects)),
    };

    let app = build_router(state, identity);

    let addr = config.server.addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("orgbridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
