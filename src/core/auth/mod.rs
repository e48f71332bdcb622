//! Authentication module for passgate
//!
//! This module provides authentication functionality including:
//! - bcrypt password hashing and verification
//! - JWT token issuing and validation
//! - Registration, login, and token-authorized password change
//! - REST API endpoints for auth operations

pub mod api;
pub mod jwt;
pub mod password;
pub mod service;

pub use api::{ApiResponse, ApiStatus, AuthApiState, auth_api_router};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService, MAX_EXPIRATION_MINUTES};
pub use password::{DEFAULT_BCRYPT_COST, PasswordError, PasswordHasher};
pub use service::{
    AuthError, AuthService, ChangePasswordRequest, LoginRequest, MIN_PASSWORD_LENGTH,
    RegisterRequest,
};
