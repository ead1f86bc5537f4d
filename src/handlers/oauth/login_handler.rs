use crate::error::FederationError;
use crate::models::AppState;
use crate::models::oauth::PendingAuthorization;
use crate::services::AuthorizationSeed;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use reqwest::Url;
use tracing::{info, warn};

use super::callback_url;

pub async fn login_handler(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    match begin_login(&app_state, &headers).await {
        Ok(url) => (
            StatusCode::FOUND,
            [
                (header::LOCATION, url.to_string()),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "could not start federated login");
            app_state.completion.emit_failure(&err)
        }
    }
}

async fn begin_login(app_state: &AppState, headers: &HeaderMap) -> Result<Url, FederationError> {
    let credentials = app_state.settings.provider_settings().await?.credentials()?;
    let redirect_uri = callback_url(headers, &app_state.config.public_scheme)?;
    let seed = AuthorizationSeed::generate();

    let mut url = app_state.provider.endpoints().authorize_url.clone();
    url.query_pairs_mut()
        .append_pair("app_id", &credentials.app_id)
        .append_pair("redirect_uri", &redirect_uri)
        .append_pair("code_challenge", &seed.code_challenge)
        .append_pair("state", &seed.state);

    app_state
        .pending
        .put(PendingAuthorization::new(seed.state, seed.code_verifier))
        .await;

    info!(%redirect_uri, "redirecting to provider for authorization");
    Ok(url)
}
