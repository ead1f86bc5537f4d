//! Zalo login for the content platform: PKCE authorization-code flow,
//! popup completion and local account resolution.

pub mod error;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod services;
pub mod store;

use axum::{
    Router,
    routing::{get, post},
};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

use handlers::oauth::{CALLBACK_PATH, LOGIN_PATH, LOGOUT_PATH};
use handlers::{callback_handler, landing_handler, login_handler, logout_handler};
use models::{AppConfig, AppState};

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(landing_handler))
        .route(LOGIN_PATH, get(login_handler))
        .route(CALLBACK_PATH, get(callback_handler))
        .route(LOGOUT_PATH, post(logout_handler))
        .with_state(app_state)
}

pub fn session_layer(config: &AppConfig) -> SessionManagerLayer<MemoryStore> {
    let session_expiry = Expiry::OnInactivity(config.session_inactivity);
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.session_secure_cookie)
        .with_same_site(SameSite::Lax)
        .with_expiry(session_expiry)
}
