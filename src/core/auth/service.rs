//! Authentication service
//!
//! Provides business logic for registration, login, and token-authorized
//! password change. Coordinates between the credential store, the password
//! hasher, and the JWT service.
//!
//! Request fields arrive as raw JSON values: a field that is missing or not a
//! string is a validation failure here rather than a body parsing failure.

use serde_json::Value;
use std::sync::Arc;

use crate::core::auth::jwt::{JwtError, JwtService};
use crate::core::auth::password::{PasswordError, PasswordHasher};
use crate::core::db::models::NewAccount;
use crate::core::db::repositories::{CredentialStore, StoreError};

/// Passwords shorter than this many UTF-16 code units are rejected
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// Authentication service error types.
///
/// The `Display` text of every recoverable variant is the message sent to
/// the client.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username")]
    InvalidUsername,

    #[error("Invalid email")]
    InvalidEmail,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Password too small. Should be atleast 6 characters")]
    PasswordTooShort,

    #[error("Username already in use")]
    UsernameAlreadyExists,

    #[error("Invalid username/password")]
    InvalidCredentials,

    #[error(";))")]
    InvalidToken,

    #[error("Credential store error: {0}")]
    Store(#[source] StoreError),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] PasswordError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Whether this is an infrastructure fault rather than a user-facing outcome
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Store(_) | AuthError::Hashing(_) | AuthError::InternalError(_)
        )
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken => AuthError::UsernameAlreadyExists,
            other => AuthError::Store(other),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired | JwtError::InvalidToken | JwtError::DecodingError(_) => {
                AuthError::InvalidToken
            }
            JwtError::MissingSecret
            | JwtError::EncodingError(_)
            | JwtError::InvalidExpiration(_) => AuthError::InternalError(err.to_string()),
        }
    }
}

/// Registration request data
#[derive(Clone, Default, serde::Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

/// Login request data
#[derive(Clone, Default, serde::Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

/// Password change request data
#[derive(Clone, Default, serde::Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub token: Option<Value>,
    #[serde(default, rename = "newpassword")]
    pub new_password: Option<Value>,
}

/// A non-empty string field
fn required_string(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// PostgreSQL text columns cannot hold NUL
fn storable(text: &str) -> bool {
    !text.contains('\0')
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    jwt_service: JwtService,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        jwt_service: JwtService,
    ) -> Self {
        Self {
            store,
            hasher,
            jwt_service,
        }
    }

    /// Validate a password about to be stored
    fn validate_new_password(value: Option<&Value>) -> Result<&str, AuthError> {
        let password = required_string(value).ok_or(AuthError::InvalidPassword)?;

        if password.encode_utf16().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort);
        }

        Ok(password)
    }

    /// Register a new account
    pub async fn register(&self, request: RegisterRequest) -> Result<(), AuthError> {
        let username = required_string(request.username.as_ref())
            .filter(|u| storable(u))
            .ok_or(AuthError::InvalidUsername)?;
        let email = required_string(request.email.as_ref())
            .filter(|e| storable(e))
            .ok_or(AuthError::InvalidEmail)?;
        let password = Self::validate_new_password(request.password.as_ref())?;

        let password_hash = self.hasher.hash(password)?;

        let account = self
            .store
            .create(NewAccount::new(username, email, password_hash))
            .await?;

        tracing::debug!("Created account {} for {}", account.id, account.username);

        Ok(())
    }

    /// Check a username/password pair and issue a token.
    ///
    /// Unknown usernames and wrong passwords fail identically, and both paths
    /// run one bcrypt verification.
    pub async fn login(&self, request: LoginRequest) -> Result<String, AuthError> {
        let password = request
            .password
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default();

        let username = request
            .username
            .as_ref()
            .and_then(Value::as_str)
            .filter(|u| storable(u));

        let account = match username {
            Some(username) => self.store.find_by_username(username).await?,
            None => None,
        };

        let Some(account) = account else {
            self.hasher.verify_dummy(password);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(self.jwt_service.issue(account.id, &account.username)?)
    }

    /// Replace the password of the account named by a verified token
    pub async fn change_password(&self, request: ChangePasswordRequest) -> Result<(), AuthError> {
        let new_password = Self::validate_new_password(request.new_password.as_ref())?;

        let token = request
            .token
            .as_ref()
            .and_then(Value::as_str)
            .ok_or(AuthError::InvalidToken)?;

        let claims = self.jwt_service.verify(token).map_err(|err| {
            tracing::debug!("Token rejected: {}", err);
            AuthError::from(err)
        })?;

        let password_hash = self.hasher.hash(new_password)?;

        let updated = self.store.update_password(claims.id, &password_hash).await?;
        if updated == 0 {
            tracing::warn!("Password change matched no account (id {})", claims.id);
        }

        Ok(())
    }
}
