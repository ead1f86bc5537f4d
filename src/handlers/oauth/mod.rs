mod callback_handler;
mod login_handler;
mod logout_handler;

pub use callback_handler::callback_handler;
pub use login_handler::login_handler;
pub use logout_handler::logout_handler;

use axum::http::HeaderMap;

use crate::error::FederationError;

pub const LOGIN_PATH: &str = "/auth/zalo/login";
pub const CALLBACK_PATH: &str = "/auth/zalo/callback";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Builds the callback URL from the request's own host so one deployment
/// works behind any domain.
pub(crate) fn callback_url(
    headers: &HeaderMap,
    default_scheme: &str,
) -> Result<String, FederationError> {
    let host = first_header_value(headers, "x-forwarded-host")
        .or_else(|| first_header_value(headers, "host"))
        .ok_or_else(|| FederationError::Configuration("request carries no host".into()))?;
    if !is_valid_host(host) {
        return Err(FederationError::Configuration(format!(
            "refusing suspicious host header {host:?}"
        )));
    }

    let scheme = match first_header_value(headers, "x-forwarded-proto") {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        Some(proto) if proto.eq_ignore_ascii_case("http") => "http",
        _ => default_scheme,
    };
    Ok(format!("{scheme}://{host}{CALLBACK_PATH}"))
}

fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn is_valid_host(host: &str) -> bool {
    host.len() <= 255
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}
