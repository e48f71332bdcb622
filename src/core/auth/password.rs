//! Password hashing with bcrypt
//!
//! Hashes embed their own random salt and cost, so verification only needs
//! the stored string. Comparison inside `bcrypt::verify` is constant-time.

/// Work factor used when none is configured
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Cost bounds accepted by bcrypt
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Candidate verified when the account does not exist
const DUMMY_PASSWORD: &str = "passgate-timing-equalizer";

/// Password hashing error types
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Cannot hash an empty password")]
    EmptyPassword,

    #[error("Invalid bcrypt cost {0} (expected 4..=31)")]
    InvalidCost(u32),

    #[error("Password hashing failed: {0}")]
    HashingError(#[from] bcrypt::BcryptError),
}

/// Salted, tunable-cost password hasher
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt cost
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(PasswordError::InvalidCost(cost));
        }

        let dummy_hash = bcrypt::hash(DUMMY_PASSWORD, cost)?;

        Ok(Self { cost, dummy_hash })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::EmptyPassword);
        }

        Ok(bcrypt::hash(password, self.cost)?)
    }

    /// Verify a password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; only a malformed hash is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        Ok(bcrypt::verify(password, hash)?)
    }

    /// Spend the same work as [`verify`](Self::verify) when there is no hash
    /// to check against. Always reports a mismatch.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let _ = bcrypt::verify(password, &self.dummy_hash);
        false
    }
}
