use crate::error::FederationError;
use crate::models::AppState;
use crate::models::LocalAccount;
use crate::models::oauth::{CallbackParams, IdentityOutcome};
use crate::services::{AccountResolver, SessionEstablisher};
use axum::{
    extract::{RawQuery, State},
    response::Response,
};
use tower_sessions::Session;
use tracing::{info, warn};

/// Finishes the login popup. Always answers with the completion page, never
/// with a bare error status.
pub async fn callback_handler(
    State(app_state): State<AppState>,
    session: Session,
    RawQuery(query): RawQuery,
) -> Response {
    let params = CallbackParams::from_query(query.as_deref());
    match complete_login(&app_state, session, params).await {
        Ok(account) => app_state.completion.emit_success(&account),
        Err(err) => {
            warn!(error = %err, "federated login failed");
            app_state.completion.emit_failure(&err)
        }
    }
}

async fn complete_login(
    app_state: &AppState,
    session: Session,
    params: CallbackParams,
) -> Result<LocalAccount, FederationError> {
    if let Some(error) = params.error {
        // burn the state so the attempt cannot be resumed
        if let Some(state) = params.state.as_deref() {
            app_state.pending.take_and_delete(state).await;
        }
        return Err(FederationError::ProviderDenied(format!(
            "{error}: {}",
            params.error_description.unwrap_or_default()
        )));
    }

    let code = params.code.ok_or(FederationError::MissingCode)?;
    let state = params.state.ok_or(FederationError::MissingState)?;
    let pending = app_state
        .pending
        .take_and_delete(&state)
        .await
        .ok_or(FederationError::InvalidOrExpiredState)?;

    let credentials = app_state.settings.provider_settings().await?.credentials()?;
    let token = app_state
        .provider
        .exchange_code(&credentials, &code, &pending.code_verifier)
        .await?;
    let identity = app_state.provider.fetch_identity(&token.access_token).await;
    // provider tokens are single-use here and never stored
    drop(token);

    let establisher = SessionEstablisher::new(session);
    let anchor = match identity {
        IdentityOutcome::Restricted { .. } => Some(establisher.restricted_anchor().await?),
        _ => None,
    };

    let resolver = AccountResolver::new(
        app_state.accounts.clone(),
        app_state.config.starter_credits,
        app_state.config.account_email_domain.clone(),
    );
    let account = resolver
        .resolve(identity, anchor.as_ref(), &credentials.app_secret)
        .await?;

    establisher.establish(&account).await?;
    info!(
        account_id = %account.id,
        username = %account.username,
        profile_complete = account.profile_complete,
        "federated login completed"
    );
    Ok(account)
}
