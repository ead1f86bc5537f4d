use crate::models::AppState;
use crate::services::SessionEstablisher;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use tower_sessions::Session;
use tracing::{info, warn};

pub async fn logout_handler(State(app_state): State<AppState>, session: Session) -> impl IntoResponse {
    let establisher = SessionEstablisher::new(session);
    if let Some(account) = establisher.current_account().await {
        info!(account_id = %account.account_id, "signing out");
    }
    if let Err(err) = establisher.logout().await {
        warn!(error = %err, "failed to clear session on logout");
    }
    Redirect::to(&app_state.config.landing_path)
}
