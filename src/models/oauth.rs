use secrecy::SecretString;
use time::{Duration, OffsetDateTime};

/// One-time record created at login initiation and consumed by the callback.
#[derive(Debug)]
pub struct PendingAuthorization {
    pub state: String,
    pub code_verifier: SecretString,
    pub created_at: OffsetDateTime,
}

impl PendingAuthorization {
    pub fn new(state: String, code_verifier: SecretString) -> Self {
        Self {
            state,
            code_verifier,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn is_expired(&self, ttl: Duration, now: OffsetDateTime) -> bool {
        now - self.created_at >= ttl
    }
}

/// Query parameters the provider appends to the callback redirect.
///
/// Every field is optional so that a malformed redirect still reaches the
/// completion page instead of an extractor rejection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            // first occurrence wins
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }
        params
    }
}

/// Tokens returned by the provider's code exchange. Lives only for the
/// duration of one callback request.
#[derive(Debug)]
pub struct ProviderToken {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_in: u64,
    pub refresh_token_expires_in: Option<u64>,
}

/// Profile returned by the provider's `/me` endpoint.
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub provider_user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub birthday: Option<String>,
    pub gender: Option<String>,
}

/// Classified result of a profile lookup.
#[derive(Debug, Clone)]
pub enum IdentityOutcome {
    /// Full profile with a stable provider user id.
    Full(ProviderIdentity),
    /// The provider confirmed the token but withheld the profile.
    Restricted { code: i64, message: String },
    /// No usable identity.
    Invalid(String),
}
