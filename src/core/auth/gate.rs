//! Request-time authorization gate.
//!
//! Resolves the Authorization header into a three-way result: an identity,
//! anonymity, or an error. The gate itself never rejects a request for
//! being anonymous; whether anonymity is acceptable is the handler's call.

use chrono::Utc;

use crate::core::auth::service::{AccountIdentity, AuthError};
use crate::core::auth::token::{TokenCodec, TokenKind};

/// Bearer scheme prefix as it appears on the wire
const BEARER_PREFIX: &str = "Bearer ";

/// Outcome of resolving the Authorization header.
///
/// `Anonymous` means the header was absent or used a different scheme; it
/// is not an error. A header that names the bearer scheme but fails
/// verification or is expired resolves to `Err(AuthError::InvalidToken)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAttempt {
    Anonymous,
    Identity(AccountIdentity),
}

/// Verifies bearer tokens presented on requests
#[derive(Clone)]
pub struct AuthGate {
    codec: TokenCodec,
}

impl AuthGate {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    /// Resolve an Authorization header value into an identity or anonymity
    pub fn resolve(&self, header: Option<&str>) -> Result<AuthAttempt, AuthError> {
        self.resolve_at(header, Utc::now().timestamp())
    }

    fn resolve_at(&self, header: Option<&str>, now: i64) -> Result<AuthAttempt, AuthError> {
        let header = match header {
            Some(value) => value,
            None => return Ok(AuthAttempt::Anonymous),
        };

        // A different scheme is the same as no header at all
        let token = match header.strip_prefix(BEARER_PREFIX) {
            Some(token) => token,
            None => return Ok(AuthAttempt::Anonymous),
        };

        let claims = self.codec.verify_kind(token, TokenKind::Bearer)?;

        // Expiry is reported identically to an invalid signature; callers
        // must not learn which one it was
        if claims.is_expired_at(now) {
            return Err(AuthError::InvalidToken);
        }

        Ok(AuthAttempt::Identity(AccountIdentity {
            email: claims.email,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::token::Claims;

    const NOW: i64 = 1_700_000_000;

    fn gate() -> AuthGate {
        AuthGate::new(TokenCodec::new("test_secret_key_for_testing_only_32bytes!"))
    }

    fn bearer_header(gate: &AuthGate, email: &str, expires_at: i64) -> String {
        let token = gate.codec.sign(&Claims::bearer(email, expires_at)).unwrap();
        format!("Bearer {}", token)
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        assert_eq!(gate().resolve_at(None, NOW).unwrap(), AuthAttempt::Anonymous);
    }

    #[test]
    fn test_other_scheme_is_anonymous() {
        let gate = gate();

        let result = gate.resolve_at(Some("Basic dXNlcjpwYXNz"), NOW).unwrap();
        assert_eq!(result, AuthAttempt::Anonymous);

        // "Bearer" without the trailing space does not match the scheme
        let result = gate.resolve_at(Some("Bearer"), NOW).unwrap();
        assert_eq!(result, AuthAttempt::Anonymous);
    }

    #[test]
    fn test_valid_bearer_resolves_identity() {
        let gate = gate();
        let header = bearer_header(&gate, "a@x.com", NOW + 600);

        let result = gate.resolve_at(Some(&header), NOW).unwrap();
        assert_eq!(
            result,
            AuthAttempt::Identity(AccountIdentity {
                email: "a@x.com".to_string()
            })
        );
    }

    #[test]
    fn test_empty_token_is_invalid() {
        let result = gate().resolve_at(Some("Bearer "), NOW);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let result = gate().resolve_at(Some("Bearer not.a.token"), NOW);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_refresh_token_is_rejected_where_bearer_required() {
        let gate = gate();
        let refresh = gate
            .codec
            .sign(&Claims::refresh("a@x.com", NOW + 86400))
            .unwrap();

        let result = gate.resolve_at(Some(&format!("Bearer {}", refresh)), NOW);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_bearer_is_reported_as_invalid() {
        let gate = gate();
        let header = bearer_header(&gate, "a@x.com", NOW - 1);

        let result = gate.resolve_at(Some(&header), NOW);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expiry_boundary_instant_is_still_valid() {
        let gate = gate();
        // bearerExp == now must still resolve; only now > bearerExp expires
        let header = bearer_header(&gate, "a@x.com", NOW);

        let result = gate.resolve_at(Some(&header), NOW).unwrap();
        assert!(matches!(result, AuthAttempt::Identity(_)));
    }

    #[test]
    fn test_foreign_secret_is_invalid() {
        let other = AuthGate::new(TokenCodec::new("some_other_secret"));
        let header = bearer_header(&other, "a@x.com", NOW + 600);

        let result = gate().resolve_at(Some(&header), NOW);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
