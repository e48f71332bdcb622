//! Credential store repositories
//!
//! The auth service only talks to the [`CredentialStore`] trait. Two
//! implementations are provided: PostgreSQL for deployments and an
//! in-memory map used when no database is configured and in tests.

pub mod account;
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::db::models::{Account, NewAccount};

pub use account::AccountRepository;
pub use memory::InMemoryAccountStore;

/// Credential store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The username uniqueness constraint rejected the insert
    #[error("Username already exists")]
    UsernameTaken,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable account storage used by the auth service
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find an account by its exact username
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    /// Insert a new account; fails with [`StoreError::UsernameTaken`] if the
    /// username is already registered
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Replace the password hash of the account with the given id, returning
    /// the number of accounts updated (zero when the id is unknown)
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<u64, StoreError>;
}
