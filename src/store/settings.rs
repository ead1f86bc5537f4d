use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::error::FederationError;

/// Provider integration switches as kept in system settings storage.
#[derive(Debug, Default)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub app_id: Option<String>,
    pub app_secret: Option<SecretString>,
}

impl Clone for ProviderSettings {
    fn clone(&self) -> Self {
        Self {
            enabled: self.enabled,
            app_id: self.app_id.clone(),
            app_secret: self
                .app_secret
                .as_ref()
                .map(|secret| SecretString::new(secret.expose_secret().clone())),
        }
    }
}

/// Credentials of an enabled, fully configured provider app.
#[derive(Debug)]
pub struct ProviderCredentials {
    pub app_id: String,
    pub app_secret: SecretString,
}

impl ProviderSettings {
    pub fn credentials(&self) -> Result<ProviderCredentials, FederationError> {
        if !self.enabled {
            return Err(FederationError::Configuration("provider is disabled".into()));
        }
        let app_id = self
            .app_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FederationError::Configuration("app id is not set".into()))?;
        let app_secret = self
            .app_secret
            .as_ref()
            .filter(|secret| !secret.expose_secret().trim().is_empty())
            .ok_or_else(|| FederationError::Configuration("app secret is not set".into()))?;
        Ok(ProviderCredentials {
            app_id: app_id.to_string(),
            app_secret: SecretString::new(app_secret.expose_secret().clone()),
        })
    }
}

/// Read access to the provider settings, looked up on every request.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn provider_settings(&self) -> Result<ProviderSettings, FederationError>;
    async fn update_provider_settings(&self, settings: ProviderSettings)
    -> Result<(), FederationError>;
}

pub struct InMemorySettingsStore {
    provider: RwLock<ProviderSettings>,
}

impl InMemorySettingsStore {
    pub fn new(initial: ProviderSettings) -> Self {
        Self {
            provider: RwLock::new(initial),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn provider_settings(&self) -> Result<ProviderSettings, FederationError> {
        Ok(self.provider.read().await.clone())
    }

    async fn update_provider_settings(
        &self,
        settings: ProviderSettings,
    ) -> Result<(), FederationError> {
        *self.provider.write().await = settings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> ProviderSettings {
        ProviderSettings {
            enabled: true,
            app_id: Some("1234".into()),
            app_secret: Some(SecretString::new("s3cret".into())),
        }
    }

    #[test]
    fn credentials_require_enabled_flag() {
        let settings = ProviderSettings {
            enabled: false,
            ..configured()
        };
        assert!(matches!(
            settings.credentials(),
            Err(FederationError::Configuration(_))
        ));
    }

    #[test]
    fn credentials_require_id_and_secret() {
        let no_id = ProviderSettings {
            app_id: Some("  ".into()),
            ..configured()
        };
        assert!(no_id.credentials().is_err());

        let no_secret = ProviderSettings {
            app_secret: None,
            ..configured()
        };
        assert!(no_secret.credentials().is_err());

        let creds = configured().credentials().expect("configured");
        assert_eq!(creds.app_id, "1234");
        assert_eq!(creds.app_secret.expose_secret(), "s3cret");
    }

    #[tokio::test]
    async fn updates_are_visible_to_next_read() {
        let store = InMemorySettingsStore::new(ProviderSettings::default());
        assert!(!store.provider_settings().await.expect("read").enabled);

        store
            .update_provider_settings(configured())
            .await
            .expect("update");
        let settings = store.provider_settings().await.expect("read");
        assert!(settings.credentials().is_ok());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", configured());
        assert!(!rendered.contains("s3cret"));
    }
}
