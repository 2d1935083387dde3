//! Signed-token codec for bearer and refresh tokens.
//!
//! Tokens are compact HS256 JWTs carrying the owning account's email, the
//! token kind, and an absolute expiry claim named per kind (`bearerExp` for
//! bearer tokens, `refreshExp` for refresh tokens). The codec only decides
//! whether a token is cryptographically valid; expiry is an ordinary claim
//! that callers compare against the current time themselves.

use std::collections::HashSet;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Default bearer token lifetime in seconds (10 minutes)
pub const DEFAULT_BEARER_TTL_SECS: i64 = 600;

/// Default refresh token lifetime in seconds (24 hours)
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 86400;

/// Token codec errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature invalid or token malformed")]
    InvalidSignature,

    #[error("Wrong token kind")]
    WrongKind,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Token kind enum. A token of one kind must never be accepted where the
/// other is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Bearer,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Bearer => write!(f, "Bearer"),
            TokenKind::Refresh => write!(f, "Refresh"),
        }
    }
}

/// Claims embedded and signed inside every token.
///
/// Exactly one of the two expiry fields is set, matching `token_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Email of the owning account
    pub email: String,
    /// Token kind (bearer or refresh)
    pub token_type: TokenKind,
    /// Bearer expiry, absolute Unix seconds
    #[serde(rename = "bearerExp", default, skip_serializing_if = "Option::is_none")]
    pub bearer_exp: Option<i64>,
    /// Refresh expiry, absolute Unix seconds
    #[serde(rename = "refreshExp", default, skip_serializing_if = "Option::is_none")]
    pub refresh_exp: Option<i64>,
}

impl Claims {
    /// Bearer claims expiring at the given Unix-seconds instant
    pub fn bearer(email: impl Into<String>, expires_at: i64) -> Self {
        Self {
            email: email.into(),
            token_type: TokenKind::Bearer,
            bearer_exp: Some(expires_at),
            refresh_exp: None,
        }
    }

    /// Refresh claims expiring at the given Unix-seconds instant
    pub fn refresh(email: impl Into<String>, expires_at: i64) -> Self {
        Self {
            email: email.into(),
            token_type: TokenKind::Refresh,
            bearer_exp: None,
            refresh_exp: Some(expires_at),
        }
    }

    /// The expiry claim matching this token's kind. `None` means the token
    /// was signed without the expiry field its kind requires and must be
    /// treated as invalid by callers.
    pub fn expires_at(&self) -> Option<i64> {
        match self.token_type {
            TokenKind::Bearer => self.bearer_exp,
            TokenKind::Refresh => self.refresh_exp,
        }
    }

    /// Whether the token is expired at `now`. The boundary is strict: a
    /// token whose expiry equals `now` is still live.
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_at() {
            Some(exp) => now > exp,
            None => true,
        }
    }
}

/// Signs and verifies tokens with one process-wide symmetric secret.
///
/// The secret is injected at construction; nothing in the codec reads the
/// environment.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    /// Create a codec over the given signing secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign claims into a compact token string
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify a token's signature and decode its claims.
    ///
    /// A tampered or malformed token fails with `InvalidSignature` before
    /// any claim is inspected. Expiry is NOT checked here; callers compare
    /// the claim against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry lives in bearerExp/refreshExp, not the registered `exp`
        // claim, and is enforced by callers.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::InvalidSignature)?;

        Ok(data.claims)
    }

    /// Verify a token and require it to be of the given kind
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;

        if claims.token_type != kind {
            return Err(TokenError::WrongKind);
        }

        Ok(claims)
    }
}
