use askama::Template;
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::{error, warn};

use crate::handlers::oauth::{LOGIN_PATH, LOGOUT_PATH};
use crate::models::AppState;
use crate::services::SessionEstablisher;

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingPage<'a> {
    display_name: Option<String>,
    login_path: &'a str,
    logout_path: &'a str,
}

/// Where the completion page sends browsers that have no opener window.
/// A session whose account no longer loads is shown as signed out.
pub async fn landing_handler(State(app_state): State<AppState>, session: Session) -> Response {
    let display_name = match SessionEstablisher::new(session).current_account().await {
        Some(bound) => match app_state.accounts.get(bound.account_id).await {
            Ok(account) => account.map(|account| account.display_name),
            Err(err) => {
                warn!(account_id = %bound.account_id, error = %err, "could not load signed-in account");
                None
            }
        },
        None => None,
    };

    let page = LandingPage {
        display_name,
        login_path: LOGIN_PATH,
        logout_path: LOGOUT_PATH,
    };
    match page.render() {
        Ok(html) => ([(header::CACHE_CONTROL, "no-store")], Html(html)).into_response(),
        Err(err) => {
            error!(error = %err, "landing page failed to render");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
