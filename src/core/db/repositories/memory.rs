//! In-memory credential store
//!
//! Accounts are keyed by username in a `DashMap`; the entry API makes
//! create-if-absent atomic, so concurrent registrations of one username
//! resolve the same way the database constraint does.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::core::db::models::{Account, NewAccount};

/// Process-local credential store
#[derive(Clone, Default)]
pub struct InMemoryAccountStore {
    accounts: Arc<DashMap<String, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryAccountStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(username).map(|entry| entry.value().clone()))
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        match self.accounts.entry(account.username.clone()) {
            Entry::Occupied(_) => Err(StoreError::UsernameTaken),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let created = Account {
                    id: Uuid::new_v4(),
                    username: account.username,
                    email: account.email,
                    password_hash: account.password_hash,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<u64, StoreError> {
        let mut updated = 0;
        for mut entry in self.accounts.iter_mut() {
            if entry.id == id {
                entry.password_hash = password_hash.to_string();
                entry.updated_at = Utc::now();
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_id_and_finds_by_username() {
        let store = InMemoryAccountStore::new();

        let created = store
            .create(NewAccount::new("alice", "a@x.com", "hash"))
            .await
            .unwrap();

        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.email, "a@x.com");
        assert_eq!(found.password_hash, "hash");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_find_unknown_username() {
        let store = InMemoryAccountStore::new();

        assert!(store.find_by_username("nobody").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_username_keeps_first_account() {
        let store = InMemoryAccountStore::new();

        let first = store
            .create(NewAccount::new("alice", "first@x.com", "hash1"))
            .await
            .unwrap();
        let second = store
            .create(NewAccount::new("alice", "second@x.com", "hash2"))
            .await;

        assert!(matches!(second, Err(StoreError::UsernameTaken)));
        assert_eq!(store.len(), 1);

        let kept = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(kept.id, first.id);
        assert_eq!(kept.email, "first@x.com");
    }

    #[tokio::test]
    async fn test_usernames_are_case_sensitive() {
        let store = InMemoryAccountStore::new();

        store
            .create(NewAccount::new("alice", "a@x.com", "hash"))
            .await
            .unwrap();
        store
            .create(NewAccount::new("Alice", "b@x.com", "hash"))
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_update_password_by_id() {
        let store = InMemoryAccountStore::new();
        let created = store
            .create(NewAccount::new("alice", "a@x.com", "old"))
            .await
            .unwrap();

        let updated = store.update_password(created.id, "new").await.unwrap();
        assert_eq!(updated, 1);

        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "new");
        assert_eq!(found.id, created.id);
        assert!(found.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_password_unknown_id_is_noop() {
        let store = InMemoryAccountStore::new();
        store
            .create(NewAccount::new("alice", "a@x.com", "old"))
            .await
            .unwrap();

        let updated = store.update_password(Uuid::new_v4(), "new").await.unwrap();
        assert_eq!(updated, 0);

        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "old");
    }

    #[tokio::test]
    async fn test_concurrent_registrations_of_one_username() {
        let store = InMemoryAccountStore::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create(NewAccount::new("race", format!("{i}@x.com"), "hash"))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.len(), 1);
    }
}
