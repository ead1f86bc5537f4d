use thiserror::Error;

/// Failures of the federated login flow.
///
/// The `Display` text carries diagnostic detail and is only ever logged.
/// Browsers see [`FederationError::user_message`].
#[derive(Debug, Error)]
pub enum FederationError {
    #[error("provider integration is disabled or missing credentials: {0}")]
    Configuration(String),
    #[error("callback is missing the authorization code")]
    MissingCode,
    #[error("callback is missing the state parameter")]
    MissingState,
    #[error("state is unknown, already used or expired")]
    InvalidOrExpiredState,
    #[error("provider reported an authorization error: {0}")]
    ProviderDenied(String),
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),
    #[error("account resolution failed: {0}")]
    AccountResolutionFailed(String),
    #[error("session establishment failed: {0}")]
    SessionEstablishmentFailed(String),
}

impl FederationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            FederationError::Configuration(_) => {
                "Zalo login is not available right now. Please use another sign-in method."
            }
            FederationError::MissingCode => {
                "The login response was incomplete. Please try logging in again."
            }
            FederationError::MissingState | FederationError::InvalidOrExpiredState => {
                "Your login request is invalid or has expired. Please try logging in again."
            }
            FederationError::ProviderDenied(_) => "Login was cancelled.",
            FederationError::TokenExchangeFailed(_) => {
                "We could not verify your Zalo login. Please try again."
            }
            FederationError::AccountResolutionFailed(_) => {
                "We could not read your Zalo profile. Please try again."
            }
            FederationError::SessionEstablishmentFailed(_) => {
                "Your account is ready but we could not sign you in. Please try again shortly."
            }
        }
    }
}

/// Failures reported by an [`crate::store::AccountStore`].
#[derive(Debug, Error)]
pub enum AccountStoreError {
    #[error("account already exists")]
    Conflict,
    #[error("account not found")]
    NotFound,
    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Startup configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} is not a valid URL: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },
}
