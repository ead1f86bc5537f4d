use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use super::{SECRET_HEADER, ZaloClient, describe_transport_error, i64_field, str_field, u64_field};
use crate::error::FederationError;
use crate::models::oauth::ProviderToken;
use crate::store::ProviderCredentials;

impl ZaloClient {
    /// Exchanges an authorization code and its PKCE verifier for an access
    /// token. The app secret travels in a header, never in the form body.
    pub async fn exchange_code(
        &self,
        credentials: &ProviderCredentials,
        code: &str,
        code_verifier: &SecretString,
    ) -> Result<ProviderToken, FederationError> {
        let form = [
            ("app_id", credentials.app_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier.expose_secret().as_str()),
        ];

        let response = self
            .http
            .post(self.endpoints.token_url.clone())
            .header(SECRET_HEADER, credentials.app_secret.expose_secret().as_str())
            .form(&form)
            .send()
            .await
            .map_err(|err| {
                let detail = describe_transport_error(err);
                warn!(%detail, "token endpoint unreachable");
                FederationError::TokenExchangeFailed(detail)
            })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|err| {
            warn!(%status, error = %err, "token endpoint returned a non-JSON body");
            FederationError::TokenExchangeFailed(format!("HTTP {status} with unreadable body"))
        })?;

        let token = parse_token_response(status, &body)?;
        debug!(
            expires_in = token.expires_in,
            has_refresh_token = token.refresh_token.is_some(),
            "token exchange succeeded"
        );
        Ok(token)
    }
}

/// Interprets a token endpoint reply.
///
/// A success status is not enough: the provider reports errors inside a 200
/// body, so only a non-empty `access_token` counts.
pub fn parse_token_response(status: StatusCode, body: &Value) -> Result<ProviderToken, FederationError> {
    let Some(access_token) = str_field(body, "access_token") else {
        let code = i64_field(body, "error");
        let name = str_field(body, "error_name").or_else(|| str_field(body, "error_reason"));
        let description = str_field(body, "error_description").or_else(|| str_field(body, "message"));
        warn!(%status, ?code, ?name, ?description, "token endpoint returned no access token");
        return Err(FederationError::TokenExchangeFailed(format!(
            "HTTP {status}, provider error {code:?} {name:?}: {description:?}"
        )));
    };

    if !status.is_success() {
        warn!(%status, "token endpoint returned an access token with a failure status");
        return Err(FederationError::TokenExchangeFailed(format!(
            "HTTP {status} despite access token"
        )));
    }

    Ok(ProviderToken {
        access_token: SecretString::new(access_token.to_string()),
        refresh_token: str_field(body, "refresh_token").map(|t| SecretString::new(t.to_string())),
        expires_in: u64_field(body, "expires_in").unwrap_or(0),
        refresh_token_expires_in: u64_field(body, "refresh_token_expires_in"),
    })
}
