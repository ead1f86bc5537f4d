//! The page the login popup lands on once the flow finishes.
//!
//! It posts a message to the window that opened the popup (same origin
//! only) and closes itself. Without an opener it redirects to the landing
//! page after a short delay.

use std::sync::Arc;

use askama::Template;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::error::FederationError;
use crate::models::{AccountSummary, LocalAccount};

const FALLBACK_PAYLOAD: &str =
    r#"{"type":"OAUTH_LOGIN_ERROR","message":"Login failed. Please try again."}"#;
const FALLBACK_PAGE: &str =
    "<!DOCTYPE html><html><body><p>Login failed. Please try again.</p></body></html>";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum CompletionMessage {
    #[serde(rename = "OAUTH_LOGIN_SUCCESS")]
    Success { account: AccountSummary },
    #[serde(rename = "OAUTH_LOGIN_ERROR")]
    Error { message: String },
}

/// `payload` and `landing_js` are already escaped for script context.
#[derive(Template)]
#[template(path = "completion.html")]
struct CompletionPage<'a> {
    title: &'a str,
    status: &'a str,
    landing_path: &'a str,
    landing_js: &'a str,
    payload: &'a str,
    delay_ms: u64,
}

#[derive(Clone)]
pub struct CompletionResponder {
    landing_path: Arc<str>,
    redirect_delay_ms: u64,
}

impl CompletionResponder {
    pub fn new(landing_path: impl Into<String>, redirect_delay_ms: u64) -> Self {
        Self {
            landing_path: Arc::from(landing_path.into()),
            redirect_delay_ms,
        }
    }

    pub fn emit_success(&self, account: &LocalAccount) -> Response {
        self.respond(&CompletionMessage::Success {
            account: AccountSummary::from(account),
        })
    }

    /// Only [`FederationError::user_message`] reaches the page.
    pub fn emit_failure(&self, err: &FederationError) -> Response {
        self.respond(&CompletionMessage::Error {
            message: err.user_message().to_string(),
        })
    }

    fn respond(&self, message: &CompletionMessage) -> Response {
        (
            [
                (header::CACHE_CONTROL, "no-store"),
                (header::REFERRER_POLICY, "no-referrer"),
            ],
            Html(self.render(message)),
        )
            .into_response()
    }

    pub fn render(&self, message: &CompletionMessage) -> String {
        let payload = serde_json::to_string(message)
            .map(|json| escape_script(&json))
            .unwrap_or_else(|_| FALLBACK_PAYLOAD.to_string());
        let landing_js = serde_json::to_string(&*self.landing_path)
            .map(|json| escape_script(&json))
            .unwrap_or_else(|_| "\"/\"".to_string());
        let (title, status) = match message {
            CompletionMessage::Success { .. } => (
                "Signed in",
                "You are signed in. This window will close automatically.",
            ),
            CompletionMessage::Error { message } => ("Sign-in failed", message.as_str()),
        };

        let page = CompletionPage {
            title,
            status,
            landing_path: &self.landing_path,
            landing_js: &landing_js,
            payload: &payload,
            delay_ms: self.redirect_delay_ms,
        };
        page.render().unwrap_or_else(|err| {
            error!(error = %err, "completion page failed to render");
            FALLBACK_PAGE.to_string()
        })
    }
}

/// Makes JSON safe to inline inside a `<script>` element.
fn escape_script(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn responder() -> CompletionResponder {
        CompletionResponder::new("/", 1500)
    }

    #[test]
    fn success_page_posts_account_summary() {
        let id = Uuid::new_v4();
        let page = responder().render(&CompletionMessage::Success {
            account: AccountSummary {
                id,
                username: "zalo_1".into(),
                display_name: "An".into(),
                avatar_url: None,
                profile_complete: true,
            },
        });
        assert!(page.contains(r#""type":"OAUTH_LOGIN_SUCCESS""#));
        assert!(page.contains(&id.to_string()));
        assert!(page.contains(r#""username":"zalo_1""#));
        assert!(page.contains("window.opener.postMessage(message, window.location.origin)"));
        assert!(page.contains("window.close()"));
    }

    #[test]
    fn failure_page_uses_user_message_only() {
        let err = FederationError::TokenExchangeFailed("secret_key=abc123 rejected".into());
        let page = responder().render(&CompletionMessage::Error {
            message: err.user_message().to_string(),
        });
        assert!(page.contains(r#""type":"OAUTH_LOGIN_ERROR""#));
        assert!(page.contains(err.user_message()));
        assert!(!page.contains("abc123"));
    }

    #[test]
    fn falls_back_to_timed_redirect() {
        let page = CompletionResponder::new("/home", 900).render(&CompletionMessage::Error {
            message: "x".into(),
        });
        assert!(page.contains(r#"window.location.replace("/home")"#));
        assert!(page.contains("}, 900);"));
        assert!(page.contains(r#"content="2;url=/home""#));
    }

    #[test]
    fn markup_in_messages_cannot_break_out() {
        let page = responder().render(&CompletionMessage::Error {
            message: "</script><script>alert(1)</script>".into(),
        });
        assert!(!page.contains("</script><script>alert(1)"));
        assert!(page.contains("\\u003c/script\\u003e"));
        assert!(page.contains("&lt;/script&gt;"));
    }

    #[test]
    fn landing_path_is_escaped_in_markup() {
        let page = CompletionResponder::new("/a\"b", 900).render(&CompletionMessage::Error {
            message: "x".into(),
        });
        assert!(!page.contains(r#"url=/a"b"#));
        assert!(page.contains(r#"window.location.replace("/a\"b")"#));
    }

    #[test]
    fn responses_are_not_cached() {
        let response = responder().emit_failure(&FederationError::MissingCode);
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
        assert!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("text/html"))
        );
    }
}
