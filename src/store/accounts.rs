use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AccountStoreError;
use crate::models::{FederatedKey, LocalAccount};

/// The slice of the account table the federation flow relies on.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_federated(
        &self,
        key: &FederatedKey,
    ) -> Result<Option<LocalAccount>, AccountStoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<LocalAccount>, AccountStoreError>;

    /// Fails with [`AccountStoreError::Conflict`] when the federated key or the
    /// username is already taken.
    async fn insert(&self, account: LocalAccount) -> Result<LocalAccount, AccountStoreError>;

    /// Replaces the refreshable profile fields, touching nothing else.
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate<'_>,
    ) -> Result<LocalAccount, AccountStoreError>;
}

/// Profile fields a returning login may rewrite.
#[derive(Debug, Clone, Copy)]
pub struct ProfileUpdate<'a> {
    pub display_name: &'a str,
    pub avatar_url: Option<&'a str>,
    pub profile_complete: bool,
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, LocalAccount>,
    by_federated: HashMap<FederatedKey, Uuid>,
    by_username: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct InMemoryAccountStore {
    tables: RwLock<Tables>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.tables.read().await.accounts.len()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_federated(
        &self,
        key: &FederatedKey,
    ) -> Result<Option<LocalAccount>, AccountStoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_federated
            .get(key)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn get(&self, id: Uuid) -> Result<Option<LocalAccount>, AccountStoreError> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn insert(&self, account: LocalAccount) -> Result<LocalAccount, AccountStoreError> {
        let mut tables = self.tables.write().await;
        if tables.by_federated.contains_key(&account.federated)
            || tables.by_username.contains_key(&account.username)
            || tables.accounts.contains_key(&account.id)
        {
            return Err(AccountStoreError::Conflict);
        }
        tables
            .by_federated
            .insert(account.federated.clone(), account.id);
        tables.by_username.insert(account.username.clone(), account.id);
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate<'_>,
    ) -> Result<LocalAccount, AccountStoreError> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .get_mut(&id)
            .ok_or(AccountStoreError::NotFound)?;
        account.display_name = update.display_name.to_string();
        account.avatar_url = update.avatar_url.map(str::to_string);
        account.profile_complete = update.profile_complete;
        account.updated_at = OffsetDateTime::now_utc();
        Ok(account.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn account(key: FederatedKey) -> LocalAccount {
        let now = OffsetDateTime::now_utc();
        LocalAccount {
            id: Uuid::new_v4(),
            username: key.username(),
            display_name: "Someone".into(),
            avatar_url: None,
            birthday: Some("01/01/1990".into()),
            gender: None,
            email: format!("{}@users.test", key.username()),
            federated: key,
            password_placeholder: "!".into(),
            role: Role::Member,
            credits: 10,
            verified: true,
            profile_complete: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_federated_key() {
        let store = InMemoryAccountStore::new();
        store
            .insert(account(FederatedKey::verified("42")))
            .await
            .expect("first insert");
        let second = store.insert(account(FederatedKey::verified("42"))).await;
        assert!(matches!(second, Err(AccountStoreError::Conflict)));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn namespaces_are_independent_keys() {
        let store = InMemoryAccountStore::new();
        store
            .insert(account(FederatedKey::verified("42")))
            .await
            .expect("verified");
        store
            .insert(account(FederatedKey::restricted("42")))
            .await
            .expect("restricted");
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn update_profile_leaves_other_fields() {
        let store = InMemoryAccountStore::new();
        let created = store
            .insert(account(FederatedKey::verified("7")))
            .await
            .expect("insert");

        let updated = store
            .update_profile(
                created.id,
                ProfileUpdate {
                    display_name: "New Name",
                    avatar_url: Some("https://cdn/a.png"),
                    profile_complete: false,
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.display_name, "New Name");
        assert_eq!(updated.avatar_url.as_deref(), Some("https://cdn/a.png"));
        assert!(!updated.profile_complete);
        assert_eq!(updated.birthday, created.birthday);
        assert_eq!(updated.credits, created.credits);
        assert_eq!(updated.role, created.role);
        assert_eq!(updated.username, created.username);
    }

    #[tokio::test]
    async fn update_unknown_account_is_not_found() {
        let store = InMemoryAccountStore::new();
        let update = ProfileUpdate {
            display_name: "x",
            avatar_url: None,
            profile_complete: true,
        };
        let result = store.update_profile(Uuid::new_v4(), update).await;
        assert!(matches!(result, Err(AccountStoreError::NotFound)));
    }

    #[tokio::test]
    async fn get_returns_inserted_account() {
        let store = InMemoryAccountStore::new();
        let created = store
            .insert(account(FederatedKey::verified("9")))
            .await
            .expect("insert");
        let loaded = store.get(created.id).await.expect("get");
        assert_eq!(loaded, Some(created));
        assert_eq!(store.get(Uuid::new_v4()).await.expect("get"), None);
    }
}
