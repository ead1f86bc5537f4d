//! Maps a provider identity onto a local account.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AccountStoreError, FederationError};
use crate::models::oauth::IdentityOutcome;
use crate::models::{FederatedKey, LocalAccount, Role};
use crate::store::{AccountStore, ProfileUpdate};

/// Display name given to accounts whose profile is not known yet.
pub const PLACEHOLDER_DISPLAY_NAME: &str = "Zalo user";

const PSEUDO_ID_BYTES: usize = 16;

/// Profile fields refreshed on every login.
#[derive(Debug, Clone, Default)]
struct FreshProfile {
    display_name: Option<String>,
    avatar_url: Option<String>,
    birthday: Option<String>,
    gender: Option<String>,
}

pub struct AccountResolver {
    accounts: Arc<dyn AccountStore>,
    starter_credits: i64,
    email_domain: String,
}

impl AccountResolver {
    pub fn new(accounts: Arc<dyn AccountStore>, starter_credits: i64, email_domain: impl Into<String>) -> Self {
        Self {
            accounts,
            starter_credits,
            email_domain: email_domain.into(),
        }
    }

    /// Finds or creates the account for `outcome`.
    ///
    /// `restricted_anchor` is the per-browser value a withheld profile is
    /// pinned to; it is only read on that path. `pseudo_id_key` keys the
    /// identifier derived from it.
    pub async fn resolve(
        &self,
        outcome: IdentityOutcome,
        restricted_anchor: Option<&SecretString>,
        pseudo_id_key: &SecretString,
    ) -> Result<LocalAccount, FederationError> {
        match outcome {
            IdentityOutcome::Full(identity) => {
                let key = FederatedKey::verified(identity.provider_user_id);
                let fresh = FreshProfile {
                    display_name: identity.display_name,
                    avatar_url: identity.avatar_url,
                    birthday: identity.birthday,
                    gender: identity.gender,
                };
                self.resolve_key(key, Some(fresh)).await
            }
            IdentityOutcome::Restricted { .. } => {
                let anchor = restricted_anchor.ok_or_else(|| {
                    FederationError::AccountResolutionFailed(
                        "restricted profile without a session anchor".into(),
                    )
                })?;
                let pseudo_id = restricted_pseudo_id(pseudo_id_key, anchor)?;
                self.resolve_key(FederatedKey::restricted(pseudo_id), None)
                    .await
            }
            IdentityOutcome::Invalid(detail) => Err(FederationError::AccountResolutionFailed(detail)),
        }
    }

    async fn resolve_key(
        &self,
        key: FederatedKey,
        fresh: Option<FreshProfile>,
    ) -> Result<LocalAccount, FederationError> {
        if let Some(existing) = self.find(&key).await? {
            return self.refresh(existing, fresh).await;
        }

        let candidate = self.new_account(key.clone(), fresh.as_ref());
        match self.accounts.insert(candidate).await {
            Ok(account) => {
                info!(
                    account_id = %account.id,
                    username = %account.username,
                    namespace = ?account.federated.namespace,
                    "created federated account"
                );
                Ok(account)
            }
            Err(AccountStoreError::Conflict) => {
                // lost a race with a concurrent login for the same identity
                debug!(username = %key.username(), "account created concurrently, reloading");
                let existing = self.find(&key).await?.ok_or_else(|| {
                    FederationError::AccountResolutionFailed(format!(
                        "username {} is held by an unrelated account",
                        key.username()
                    ))
                })?;
                self.refresh(existing, fresh).await
            }
            Err(err) => Err(FederationError::AccountResolutionFailed(err.to_string())),
        }
    }

    async fn find(&self, key: &FederatedKey) -> Result<Option<LocalAccount>, FederationError> {
        self.accounts
            .find_by_federated(key)
            .await
            .map_err(|err| FederationError::AccountResolutionFailed(err.to_string()))
    }

    /// Applies a changed display name or avatar; nothing else is written.
    /// A real display name marks a placeholder profile complete.
    async fn refresh(
        &self,
        existing: LocalAccount,
        fresh: Option<FreshProfile>,
    ) -> Result<LocalAccount, FederationError> {
        let Some(fresh) = fresh else {
            return Ok(existing);
        };
        let profile_complete = existing.profile_complete || fresh.display_name.is_some();
        let display_name = fresh
            .display_name
            .unwrap_or_else(|| existing.display_name.clone());
        let avatar_url = fresh.avatar_url.or_else(|| existing.avatar_url.clone());
        if display_name == existing.display_name
            && avatar_url == existing.avatar_url
            && profile_complete == existing.profile_complete
        {
            return Ok(existing);
        }

        let updated = self
            .accounts
            .update_profile(
                existing.id,
                ProfileUpdate {
                    display_name: &display_name,
                    avatar_url: avatar_url.as_deref(),
                    profile_complete,
                },
            )
            .await
            .map_err(|err| {
                warn!(account_id = %existing.id, error = %err, "profile refresh failed");
                FederationError::AccountResolutionFailed(err.to_string())
            })?;
        debug!(account_id = %updated.id, "refreshed federated profile");
        Ok(updated)
    }

    fn new_account(&self, key: FederatedKey, fresh: Option<&FreshProfile>) -> LocalAccount {
        let now = OffsetDateTime::now_utc();
        let username = key.username();
        let display_name = fresh.and_then(|p| p.display_name.clone());
        LocalAccount {
            id: Uuid::new_v4(),
            email: format!("{username}@{}", self.email_domain),
            username,
            profile_complete: display_name.is_some(),
            display_name: display_name.unwrap_or_else(|| PLACEHOLDER_DISPLAY_NAME.to_string()),
            avatar_url: fresh.and_then(|p| p.avatar_url.clone()),
            birthday: fresh.and_then(|p| p.birthday.clone()),
            gender: fresh.and_then(|p| p.gender.clone()),
            federated: key,
            // not a valid hash of any password, so password login can never match
            password_placeholder: format!("!federated${}", Uuid::new_v4().simple()),
            role: Role::Member,
            credits: self.starter_credits,
            verified: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Identifier for a login whose profile was withheld.
///
/// Derived from the browser's session anchor, keyed with a server secret so
/// it cannot be computed from outside, and kept in its own namespace so it
/// never matches a provider user id.
pub fn restricted_pseudo_id(
    key: &SecretString,
    anchor: &SecretString,
) -> Result<String, FederationError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.expose_secret().as_bytes())
        .map_err(|err| FederationError::AccountResolutionFailed(err.to_string()))?;
    mac.update(b"restricted:");
    mac.update(anchor.expose_secret().as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(URL_SAFE_NO_PAD.encode(&digest[..PSEUDO_ID_BYTES]))
}
