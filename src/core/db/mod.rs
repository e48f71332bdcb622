//! Database module for passgate
//!
//! This module provides the account model, the credential store trait and
//! its PostgreSQL and in-memory implementations.

pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used items
pub use models::*;
pub use pool::{DbConfig, DbError, create_pool_with_migrations};
pub use repositories::{AccountRepository, CredentialStore, InMemoryAccountStore, StoreError};
