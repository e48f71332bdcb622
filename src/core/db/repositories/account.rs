//! Account repository for PostgreSQL
//!
//! Username uniqueness is enforced by the `accounts_username_key` constraint,
//! there is no check-then-insert.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::core::db::models::{Account, NewAccount};

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an account by ID
    #[cfg(test)]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Delete an account by ID
    #[cfg(test)]
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            StoreError::UsernameTaken
        }
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl CredentialStore for AccountRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        // TEXT cannot hold NUL, so no stored account can match
        if username.contains('\0') {
            return Ok(None);
        }

        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM accounts
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_insert_error_passes_through_other_errors() {
        let err = map_insert_error(sqlx::Error::RowNotFound);
        assert!(matches!(
            err,
            StoreError::Database(sqlx::Error::RowNotFound)
        ));
    }

    // ========================================================================
    // Integration Tests (require database)
    // ========================================================================

    async fn create_test_repo() -> AccountRepository {
        use crate::core::db::pool::{DbConfig, create_pool_with_migrations};

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
        let pool = create_pool_with_migrations(&DbConfig::new(url))
            .await
            .expect("Failed to create test pool");
        AccountRepository::new(pool)
    }

    fn unique_username(prefix: &str) -> String {
        format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_create_and_find_by_username() {
        let repo = create_test_repo().await;
        let username = unique_username("create");

        let created = repo
            .create(NewAccount::new(&username, "create@example.com", "$2b$04$hash"))
            .await
            .unwrap();

        let found = repo.find_by_username(&username).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.email, "create@example.com");
        assert_eq!(found.password_hash, "$2b$04$hash");

        repo.delete(created.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_create_duplicate_username() {
        let repo = create_test_repo().await;
        let username = unique_username("dup");

        let first = repo
            .create(NewAccount::new(&username, "one@example.com", "hash1"))
            .await
            .unwrap();
        let second = repo
            .create(NewAccount::new(&username, "two@example.com", "hash2"))
            .await;

        assert!(matches!(second, Err(StoreError::UsernameTaken)));

        let kept = repo.find_by_username(&username).await.unwrap().unwrap();
        assert_eq!(kept.id, first.id);
        assert_eq!(kept.email, "one@example.com");

        repo.delete(first.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_update_password() {
        let repo = create_test_repo().await;
        let created = repo
            .create(NewAccount::new(unique_username("upd"), "u@example.com", "old"))
            .await
            .unwrap();

        let updated = repo.update_password(created.id, "new").await.unwrap();
        assert_eq!(updated, 1);

        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.password_hash, "new");

        repo.delete(created.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_update_password_unknown_id() {
        let repo = create_test_repo().await;

        let updated = repo.update_password(Uuid::new_v4(), "new").await.unwrap();
        assert_eq!(updated, 0);
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_find_by_username_with_nul_is_none() {
        let repo = create_test_repo().await;

        let found = repo.find_by_username("a\u{0}b").await.unwrap();
        assert!(found.is_none());
    }
}
