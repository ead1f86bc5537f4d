use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ACCESS_TOKEN_HEADER, ZaloClient, describe_transport_error, i64_field, str_field};
use crate::models::oauth::{IdentityOutcome, ProviderIdentity};

/// Phrases the provider uses when it refuses profile data for policy
/// reasons (typically the caller's IP region) while the token itself is good.
const RESTRICTION_MARKERS: &[&str] = &["restrict", "region", "country", "location", "geo"];

impl ZaloClient {
    /// Looks up the profile behind `access_token`. Never fails outright;
    /// every problem is folded into [`IdentityOutcome::Invalid`].
    pub async fn fetch_identity(&self, access_token: &SecretString) -> IdentityOutcome {
        let response = match self
            .http
            .get(self.endpoints.profile_url.clone())
            .query(&[("fields", self.endpoints.profile_fields.as_str())])
            .header(ACCESS_TOKEN_HEADER, access_token.expose_secret().as_str())
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let detail = describe_transport_error(err);
                warn!(%detail, "profile endpoint unreachable");
                return IdentityOutcome::Invalid(detail);
            }
        };

        let status = response.status();
        let body: Value = match response.json().await {
            Ok(body) => body,
            // a legal-reasons refusal is often an HTML page; the status alone decides it
            Err(err) if status == StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => {
                debug!(error = %err, "restricted profile reply has no JSON body");
                Value::Null
            }
            Err(err) => {
                warn!(%status, error = %err, "profile endpoint returned a non-JSON body");
                return IdentityOutcome::Invalid(format!("HTTP {status} with unreadable body"));
            }
        };

        let outcome = classify_profile(status, body);
        match &outcome {
            IdentityOutcome::Full(identity) => {
                debug!(provider_user_id = %identity.provider_user_id, "profile fetched")
            }
            IdentityOutcome::Restricted { code, message } => {
                warn!(%status, code, %message, "profile withheld by provider restriction")
            }
            IdentityOutcome::Invalid(detail) => warn!(%status, %detail, "profile unusable"),
        }
        outcome
    }
}

/// Sorts a profile reply into full, restricted or unusable.
pub fn classify_profile(status: StatusCode, body: Value) -> IdentityOutcome {
    let error_code = i64_field(&body, "error").unwrap_or(0);
    if error_code != 0 || status == StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS {
        let message = str_field(&body, "message").unwrap_or_default().to_string();
        let lowered = message.to_ascii_lowercase();
        if status == StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS
            || RESTRICTION_MARKERS.iter().any(|marker| lowered.contains(marker))
        {
            return IdentityOutcome::Restricted {
                code: error_code,
                message,
            };
        }
        return IdentityOutcome::Invalid(format!(
            "HTTP {status}, provider error {error_code}: {message}"
        ));
    }

    if !status.is_success() {
        return IdentityOutcome::Invalid(format!("HTTP {status}"));
    }

    let provider_user_id = match body.get("id") {
        Some(Value::String(id)) => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    };
    if provider_user_id.is_empty() || provider_user_id == "0" {
        return IdentityOutcome::Invalid("profile has no user id".to_string());
    }

    let avatar_url = body
        .pointer("/picture/data/url")
        .and_then(Value::as_str)
        .or_else(|| body.get("picture").and_then(Value::as_str))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    IdentityOutcome::Full(ProviderIdentity {
        provider_user_id,
        display_name: str_field(&body, "name").map(str::to_string),
        avatar_url,
        birthday: str_field(&body, "birthday").map(str::to_string),
        gender: str_field(&body, "gender").map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_profile() {
        let outcome = classify_profile(
            StatusCode::OK,
            json!({
                "id": "8642",
                "name": "Lan Nguyen",
                "picture": { "data": { "url": "https://s120.avatar/8642.jpg" } },
                "error": 0,
                "message": "Success"
            }),
        );
        let IdentityOutcome::Full(identity) = outcome else {
            panic!("expected full identity, got {outcome:?}");
        };
        assert_eq!(identity.provider_user_id, "8642");
        assert_eq!(identity.display_name.as_deref(), Some("Lan Nguyen"));
        assert_eq!(
            identity.avatar_url.as_deref(),
            Some("https://s120.avatar/8642.jpg")
        );
    }

    #[test]
    fn numeric_id_is_accepted() {
        let outcome = classify_profile(StatusCode::OK, json!({ "id": 99 }));
        assert!(matches!(outcome, IdentityOutcome::Full(ref i) if i.provider_user_id == "99"));
    }

    #[test]
    fn missing_id_is_invalid() {
        let outcome = classify_profile(StatusCode::OK, json!({ "name": "No Id" }));
        assert!(matches!(outcome, IdentityOutcome::Invalid(_)));
    }

    #[test]
    fn region_restriction_is_restricted() {
        let outcome = classify_profile(
            StatusCode::OK,
            json!({ "error": -501, "message": "Request is restricted in your region" }),
        );
        assert!(matches!(
            outcome,
            IdentityOutcome::Restricted { code: -501, .. }
        ));
    }

    #[test]
    fn legal_reasons_status_is_restricted() {
        let outcome = classify_profile(StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS, json!({}));
        assert!(matches!(outcome, IdentityOutcome::Restricted { .. }));
    }

    #[test]
    fn legal_reasons_status_without_json_is_restricted() {
        let outcome = classify_profile(StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS, Value::Null);
        assert!(matches!(
            outcome,
            IdentityOutcome::Restricted { code: 0, .. }
        ));
    }

    #[test]
    fn demographics_are_carried_through() {
        let outcome = classify_profile(
            StatusCode::OK,
            json!({ "id": "5", "birthday": "01/02/1990", "gender": "female" }),
        );
        let IdentityOutcome::Full(identity) = outcome else {
            panic!("expected full identity, got {outcome:?}");
        };
        assert_eq!(identity.birthday.as_deref(), Some("01/02/1990"));
        assert_eq!(identity.gender.as_deref(), Some("female"));
    }

    #[test]
    fn other_provider_errors_are_invalid() {
        let outcome = classify_profile(
            StatusCode::OK,
            json!({ "error": -124, "message": "Access token is invalid" }),
        );
        assert!(matches!(outcome, IdentityOutcome::Invalid(_)));
    }

    #[test]
    fn server_error_without_body_is_invalid() {
        let outcome = classify_profile(StatusCode::INTERNAL_SERVER_ERROR, json!({}));
        assert!(matches!(outcome, IdentityOutcome::Invalid(_)));
    }
}
