//! Last of Guss backend binary entrypoint wiring REST and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "mongo-store")]
use guss_back::dao::{
    game_store::{
        GameStore,
        mongodb::{MongoConfig, MongoGameStore},
    },
    storage::StorageError,
};
#[cfg(feature = "mongo-store")]
use guss_back::services::storage_supervisor;
use guss_back::{
    config::AppConfig,
    dao::game_store::memory::MemoryGameStore,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    bootstrap_storage(app_state.clone()).await;
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the storage backend the server will run against.
///
/// When `MONGO_URI` is set (and the `mongo-store` feature is compiled in) the
/// MongoDB store is connected and supervised in the background; requests are
/// answered with 503 until the first connection succeeds. Without a URI the
/// in-process memory store is installed immediately.
async fn bootstrap_storage(state: SharedState) {
    #[cfg(feature = "mongo-store")]
    if env::var("MONGO_URI").is_ok() {
        tokio::spawn(storage_supervisor::run(state, connect_mongo));
        return;
    }

    info!("MONGO_URI not set; using the in-process memory store");
    state
        .install_game_store(Arc::new(MemoryGameStore::new()))
        .await;
}

/// Connect the MongoDB store from environment configuration.
#[cfg(feature = "mongo-store")]
async fn connect_mongo() -> Result<Arc<dyn GameStore>, StorageError> {
    let config = MongoConfig::from_env().await?;
    let store = MongoGameStore::connect(config).await?;
    Ok(Arc::new(store) as Arc<dyn GameStore>)
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
