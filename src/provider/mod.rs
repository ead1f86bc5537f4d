//! Outbound calls to the identity provider.

mod profile;
mod token;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::models::ProviderEndpoints;

pub use profile::classify_profile;
pub use token::parse_token_response;

/// Header carrying the app secret on the token endpoint.
pub const SECRET_HEADER: &str = "secret_key";
/// Header carrying the access token on the profile endpoint.
pub const ACCESS_TOKEN_HEADER: &str = "access_token";

#[derive(Clone)]
pub struct ZaloClient {
    http: reqwest::Client,
    endpoints: Arc<ProviderEndpoints>,
}

impl ZaloClient {
    pub fn new(endpoints: ProviderEndpoints, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            endpoints: Arc::new(endpoints),
        })
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }
}

fn describe_transport_error(err: reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        // keep query strings out of the message
        format!("transport error: {}", err.without_url())
    }
}

/// Accepts both `3600` and `"3600"`; the provider is not consistent.
fn u64_field(body: &Value, key: &str) -> Option<u64> {
    match body.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn i64_field(body: &Value, key: &str) -> Option<i64> {
    match body.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
