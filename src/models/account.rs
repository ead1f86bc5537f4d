use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Provider tag recorded on federated accounts.
pub const PROVIDER: &str = "zalo";

/// Federated sign-in only ever creates members; elevated roles are granted
/// elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Member,
}

/// Which kind of provider identifier backs a federated account.
///
/// `Restricted` ids are derived locally when the provider withholds the
/// profile and never collide with `Verified` ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityNamespace {
    Verified,
    Restricted,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FederatedKey {
    pub provider: &'static str,
    pub namespace: IdentityNamespace,
    pub id: String,
}

impl FederatedKey {
    pub fn verified(id: impl Into<String>) -> Self {
        Self {
            provider: PROVIDER,
            namespace: IdentityNamespace::Verified,
            id: id.into(),
        }
    }

    pub fn restricted(id: impl Into<String>) -> Self {
        Self {
            provider: PROVIDER,
            namespace: IdentityNamespace::Restricted,
            id: id.into(),
        }
    }

    /// Deterministic username, so duplicate creation attempts hit the
    /// username uniqueness constraint.
    pub fn username(&self) -> String {
        match self.namespace {
            IdentityNamespace::Verified => format!("{}_{}", self.provider, self.id),
            IdentityNamespace::Restricted => format!("{}_r_{}", self.provider, self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalAccount {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// Demographics as first reported by the provider; never refreshed.
    pub birthday: Option<String>,
    pub gender: Option<String>,
    pub federated: FederatedKey,
    pub email: String,
    pub password_placeholder: String,
    pub role: Role,
    pub credits: i64,
    pub verified: bool,
    pub profile_complete: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields of an account that are safe to hand to the browser.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub profile_complete: bool,
}

impl From<&LocalAccount> for AccountSummary {
    fn from(account: &LocalAccount) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            display_name: account.display_name.clone(),
            avatar_url: account.avatar_url.clone(),
            profile_complete: account.profile_complete,
        }
    }
}
