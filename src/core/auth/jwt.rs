//! JWT utilities for token generation and validation
//!
//! Tokens are HS256-signed and carry the account id and username. Expiry is
//! optional: without a configured lifetime no `exp` claim is written and the
//! token stays valid for as long as the secret does.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted token lifetime, one hundred years
pub const MAX_EXPIRATION_MINUTES: i64 = 100 * 365 * 24 * 60;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token lifetime in minutes, `None` for tokens without expiry
    pub expiration_minutes: Option<i64>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_minutes", &self.expiration_minutes)
            .finish()
    }
}

impl JwtConfig {
    /// Create a new JWT configuration without token expiry
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration_minutes: None,
        }
    }

    /// Set token expiration
    pub fn expiration(mut self, minutes: i64) -> Self {
        self.expiration_minutes = Some(minutes);
        self
    }
}

/// JWT errors
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT signing secret is empty")]
    MissingSecret,

    #[error("Token encoding failed: {0}")]
    EncodingError(String),

    #[error("Token decoding failed: {0}")]
    DecodingError(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token lifetime out of range: {0} minutes")]
    InvalidExpiration(i64),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidToken | ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                JwtError::InvalidToken
            }
            _ => JwtError::DecodingError(err.to_string()),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID
    pub id: Uuid,
    /// Username at the time of issue
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp), present only when expiry is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Create a new JWT service. The secret must not be empty and the
    /// lifetime, if any, must be within `MAX_EXPIRATION_MINUTES` either way.
    pub fn new(config: JwtConfig) -> Result<Self, JwtError> {
        if config.secret.is_empty() {
            return Err(JwtError::MissingSecret);
        }

        if let Some(minutes) = config.expiration_minutes
            && !(-MAX_EXPIRATION_MINUTES..=MAX_EXPIRATION_MINUTES).contains(&minutes)
        {
            return Err(JwtError::InvalidExpiration(minutes));
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
        })
    }

    /// Issue a signed token for an account
    pub fn issue(&self, id: Uuid, username: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let exp = match self.config.expiration_minutes {
            Some(minutes) => {
                let expires_at = Duration::try_minutes(minutes)
                    .and_then(|lifetime| now.checked_add_signed(lifetime))
                    .ok_or(JwtError::InvalidExpiration(minutes))?;
                Some(expires_at.timestamp())
            }
            None => None,
        };

        let claims = Claims {
            id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Check the signature (and expiry, when configured) and decode the claims
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        // Set leeway to 0 for strict expiration checking
        validation.leeway = 0;
        if self.config.expiration_minutes.is_some() {
            validation.set_required_spec_claims(&["exp"]);
        } else {
            validation.required_spec_claims.clear();
        }

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(token_data.claims)
    }

    /// Configured token lifetime in minutes
    pub fn expiration_minutes(&self) -> Option<i64> {
        self.config.expiration_minutes
    }
}
