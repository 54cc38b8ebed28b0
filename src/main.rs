use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use scrap_pickup::auth::AuthSession;
use scrap_pickup::config::Config;
use scrap_pickup::error::AppError;
use scrap_pickup::models::pickup::PickupRequest;
use scrap_pickup::store::persistence::{InMemory, JsonFile, Persistence};
use scrap_pickup::{api, state};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let (pickup_backend, session_backend) = persistence_backends(&config)?;
    let app_state = state::AppState::open(
        config.verification_code.clone(),
        config.recent_limit,
        config.event_buffer_size,
        pickup_backend,
        session_backend,
    )?;
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

type Backends = (
    Box<dyn Persistence<PickupRequest>>,
    Box<dyn Persistence<AuthSession>>,
);

fn persistence_backends(config: &Config) -> Result<Backends, AppError> {
    match &config.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                AppError::Internal(format!("failed to create {}: {err}", dir.display()))
            })?;
            Ok((
                Box::new(JsonFile::new(dir.join("pickups.json"))),
                Box::new(JsonFile::new(dir.join("sessions.json"))),
            ))
        }
        None => Ok((Box::new(InMemory), Box::new(InMemory))),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
