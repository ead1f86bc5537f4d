use oauth2::CsrfToken;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::FederationError;
use crate::models::LocalAccount;

pub const SESSION_ACCOUNT_KEY: &str = "auth.account";

/// Per-browser random value that restricted sign-ins are pinned to. It
/// survives logout so the same browser keeps reaching the same account.
pub const RESTRICTED_ANCHOR_KEY: &str = "auth.restricted_anchor";

const ANCHOR_BYTES: u32 = 32;

/// What the session remembers about the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAccount {
    pub account_id: Uuid,
    pub username: String,
}

/// Handle to an established login.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub account_id: Uuid,
    pub session_id: Option<String>,
}

/// Binds accounts to the request's cookie session.
#[derive(Clone)]
pub struct SessionEstablisher {
    session: Session,
}

impl SessionEstablisher {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub async fn establish(&self, account: &LocalAccount) -> Result<AuthSession, FederationError> {
        // a fresh id on privilege change defeats session fixation
        self.session.cycle_id().await.map_err(session_failure)?;
        self.session
            .insert(
                SESSION_ACCOUNT_KEY,
                SessionAccount {
                    account_id: account.id,
                    username: account.username.clone(),
                },
            )
            .await
            .map_err(session_failure)?;
        self.session.save().await.map_err(session_failure)?;

        debug!(account_id = %account.id, "session established");
        Ok(AuthSession {
            account_id: account.id,
            session_id: self.session.id().map(|id| id.to_string()),
        })
    }

    pub async fn current_account(&self) -> Option<SessionAccount> {
        match self.session.get::<SessionAccount>(SESSION_ACCOUNT_KEY).await {
            Ok(account) => account,
            Err(err) => {
                warn!(error = %err, "could not read session");
                None
            }
        }
    }

    /// Returns this browser's restricted-login anchor, minting one on first use.
    pub async fn restricted_anchor(&self) -> Result<SecretString, FederationError> {
        if let Some(anchor) = self
            .session
            .get::<String>(RESTRICTED_ANCHOR_KEY)
            .await
            .map_err(session_failure)?
        {
            return Ok(SecretString::new(anchor));
        }

        let anchor = CsrfToken::new_random_len(ANCHOR_BYTES).into_secret();
        self.session
            .insert(RESTRICTED_ANCHOR_KEY, anchor.clone())
            .await
            .map_err(session_failure)?;
        debug!("minted restricted sign-in anchor");
        Ok(SecretString::new(anchor))
    }

    /// Drops the account binding and rotates the session id. The restricted
    /// anchor is kept.
    pub async fn logout(&self) -> Result<(), tower_sessions::session::Error> {
        self.session
            .remove::<SessionAccount>(SESSION_ACCOUNT_KEY)
            .await?;
        self.session.cycle_id().await
    }
}

fn session_failure(err: tower_sessions::session::Error) -> FederationError {
    warn!(error = %err, "session store rejected login");
    FederationError::SessionEstablishmentFailed(err.to_string())
}
