use federated_login::models::{AppConfig, AppState};
use federated_login::store::spawn_sweeper;
use federated_login::{router, session_layer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,federated_login=debug")),
        )
        .init();

    let app_config = AppConfig::from_env()?;
    let app_state = AppState::new(app_config.clone())?;

    let sweeper = spawn_sweeper(app_state.pending.clone(), app_config.sweep_interval);

    let app = router(app_state).layer(session_layer(&app_config));

    let listener = tokio::net::TcpListener::bind(&app_config.bind_addr).await?;
    info!(addr = %app_config.bind_addr, "listening");
    axum::serve(listener, app.into_make_service()).await?;

    sweeper.abort();
    Ok(())
}
