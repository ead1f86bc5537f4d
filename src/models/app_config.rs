use std::env;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::Url;
use secrecy::SecretString;

use crate::error::ConfigError;
use crate::provider::ZaloClient;
use crate::services::completion::CompletionResponder;
use crate::store::{
    AccountStore, InMemoryAccountStore, InMemoryPendingStore, InMemorySettingsStore,
    PendingAuthorizationStore, ProviderSettings, SettingsStore,
};

const DEFAULT_AUTHORIZE_URL: &str = "https://oauth.zaloapp.com/v4/permission";
const DEFAULT_TOKEN_URL: &str = "https://oauth.zaloapp.com/v4/access_token";
const DEFAULT_PROFILE_URL: &str = "https://graph.zalo.me/v2.0/me";
const DEFAULT_PROFILE_FIELDS: &str = "id,name,picture,birthday,gender";

#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub authorize_url: Url,
    pub token_url: Url,
    pub profile_url: Url,
    pub profile_fields: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: Url::parse(DEFAULT_AUTHORIZE_URL).expect("static URL"),
            token_url: Url::parse(DEFAULT_TOKEN_URL).expect("static URL"),
            profile_url: Url::parse(DEFAULT_PROFILE_URL).expect("static URL"),
            profile_fields: DEFAULT_PROFILE_FIELDS.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Scheme used for the callback URL when no `X-Forwarded-Proto` is sent.
    pub public_scheme: String,
    pub endpoints: ProviderEndpoints,
    pub provider_timeout: std::time::Duration,
    pub state_ttl: time::Duration,
    pub sweep_interval: std::time::Duration,
    pub starter_credits: i64,
    pub account_email_domain: String,
    pub landing_path: String,
    pub completion_redirect_delay_ms: u64,
    pub session_secure_cookie: bool,
    pub session_inactivity: time::Duration,
    /// Initial contents of the settings store.
    pub provider_settings: ProviderSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:10000".to_string(),
            public_scheme: "http".to_string(),
            endpoints: ProviderEndpoints::default(),
            provider_timeout: std::time::Duration::from_secs(8),
            state_ttl: time::Duration::minutes(10),
            sweep_interval: std::time::Duration::from_secs(60),
            starter_credits: 10,
            account_email_domain: "users.noreply.local".to_string(),
            landing_path: "/".to_string(),
            completion_redirect_delay_ms: 1500,
            session_secure_cookie: false,
            session_inactivity: time::Duration::hours(6),
            provider_settings: ProviderSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let endpoints = ProviderEndpoints {
            authorize_url: url_var("ZALO_AUTHORIZE_URL", DEFAULT_AUTHORIZE_URL)?,
            token_url: url_var("ZALO_TOKEN_URL", DEFAULT_TOKEN_URL)?,
            profile_url: url_var("ZALO_PROFILE_URL", DEFAULT_PROFILE_URL)?,
            profile_fields: string_var("ZALO_PROFILE_FIELDS", DEFAULT_PROFILE_FIELDS),
        };

        let provider_settings = ProviderSettings {
            enabled: parsed_var("ZALO_ENABLED", false)?,
            app_id: env::var("ZALO_APP_ID").ok().filter(|v| !v.is_empty()),
            app_secret: env::var("ZALO_APP_SECRET")
                .ok()
                .filter(|v| !v.is_empty())
                .map(SecretString::new),
        };

        Ok(Self {
            bind_addr: string_var("BIND_ADDR", &defaults.bind_addr),
            public_scheme: scheme_var("PUBLIC_SCHEME", &defaults.public_scheme)?,
            endpoints,
            provider_timeout: std::time::Duration::from_secs(parsed_var(
                "PROVIDER_HTTP_TIMEOUT_SECS",
                8u64,
            )?),
            state_ttl: time::Duration::seconds(parsed_var("OAUTH_STATE_TTL_SECS", 600i64)?),
            sweep_interval: std::time::Duration::from_secs(parsed_var(
                "OAUTH_SWEEP_INTERVAL_SECS",
                60u64,
            )?),
            starter_credits: parsed_var("STARTER_CREDITS", defaults.starter_credits)?,
            account_email_domain: string_var(
                "ACCOUNT_EMAIL_DOMAIN",
                &defaults.account_email_domain,
            ),
            landing_path: string_var("LANDING_PATH", &defaults.landing_path),
            completion_redirect_delay_ms: parsed_var(
                "COMPLETION_REDIRECT_DELAY_MS",
                defaults.completion_redirect_delay_ms,
            )?,
            session_secure_cookie: parsed_var("SESSION_SECURE_COOKIE", false)?,
            session_inactivity: time::Duration::hours(parsed_var(
                "SESSION_INACTIVITY_HOURS",
                6i64,
            )?),
            provider_settings,
        })
    }
}

fn string_var(key: &'static str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}

fn url_var(key: &'static str, default: &str) -> Result<Url, ConfigError> {
    Url::parse(&string_var(key, default)).map_err(|source| ConfigError::InvalidUrl { key, source })
}

fn scheme_var(key: &'static str, default: &str) -> Result<String, ConfigError> {
    let value = string_var(key, default).to_ascii_lowercase();
    match value.as_str() {
        "http" | "https" => Ok(value),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub settings: Arc<dyn SettingsStore>,
    pub pending: Arc<dyn PendingAuthorizationStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub provider: ZaloClient,
    pub completion: CompletionResponder,
}

impl AppState {
    /// Wires the in-memory stores around `config`.
    pub fn new(config: AppConfig) -> Result<Self, reqwest::Error> {
        let settings = Arc::new(InMemorySettingsStore::new(config.provider_settings.clone()));
        let pending = Arc::new(InMemoryPendingStore::new(config.state_ttl));
        let accounts = Arc::new(InMemoryAccountStore::new());
        Self::with_stores(config, settings, pending, accounts)
    }

    pub fn with_stores(
        config: AppConfig,
        settings: Arc<dyn SettingsStore>,
        pending: Arc<dyn PendingAuthorizationStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Result<Self, reqwest::Error> {
        let provider = ZaloClient::new(config.endpoints.clone(), config.provider_timeout)?;
        let completion = CompletionResponder::new(
            config.landing_path.clone(),
            config.completion_redirect_delay_ms,
        );
        Ok(Self {
            config: Arc::new(config),
            settings,
            pending,
            accounts,
            provider,
            completion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_provider_hosts() {
        let config = AppConfig::default();
        assert_eq!(config.endpoints.token_url.path(), "/v4/access_token");
        assert_eq!(config.endpoints.profile_url.host_str(), Some("graph.zalo.me"));
        assert_eq!(config.state_ttl, time::Duration::minutes(10));
        assert!(!config.provider_settings.enabled);
    }

    #[test]
    fn scheme_must_be_http_or_https() {
        assert!(matches!(
            scheme_var("FEDERATED_LOGIN_TEST_UNSET_SCHEME", "ftp"),
            Err(ConfigError::Invalid { .. })
        ));
        assert_eq!(
            scheme_var("FEDERATED_LOGIN_TEST_UNSET_SCHEME", "HTTPS").expect("scheme"),
            "https"
        );
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let value: u64 = parsed_var("FEDERATED_LOGIN_TEST_UNSET_NUMBER", 42).expect("default");
        assert_eq!(value, 42);
    }
}
