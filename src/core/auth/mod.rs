//! Authentication module
//!
//! This module provides the token lifecycle and authorization core:
//! - Signed bearer/refresh token codec
//! - Password hashing contract
//! - Login, registration, refresh rotation, and logout
//! - Request-time authorization gate
//! - REST API endpoints for auth and profile operations

pub mod api;
pub mod gate;
pub mod hasher;
pub mod service;
pub mod token;

pub use api::{ApiState, user_router};
pub use gate::{AuthAttempt, AuthGate};
pub use hasher::{BcryptHasher, HashError, PasswordHasher};
pub use service::{
    AccountIdentity, AuthError, AuthService, ProfileView, TokenGrant, TokenPairResult,
};
pub use token::{
    Claims, DEFAULT_BEARER_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, TokenCodec, TokenError, TokenKind,
};
