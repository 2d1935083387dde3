//! Token issuer and account operations.
//!
//! Orchestrates credential verification, token-pair issuance with
//! refresh-slot persistence, refresh rotation, logout, and the profile
//! operations. All failures surface as `AuthError` variants; nothing in
//! here panics on bad input.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::core::auth::hasher::{HashError, PasswordHasher};
use crate::core::auth::token::{
    Claims, DEFAULT_BEARER_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, TokenCodec, TokenError, TokenKind,
};
use crate::core::db::models::{FullProfile, ProfileUpdate, PublicProfile};
use crate::core::db::store::{CredentialStore, StoreError};

/// Authentication error types.
///
/// The display strings are the user-visible messages: credential failures
/// never reveal whether the email exists, and token failures never reveal
/// whether the problem was the signature, the kind, or a stale slot.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("User already exists")]
    AlreadyExists,

    #[error("Invalid JWT token")]
    InvalidToken,

    #[error("JWT token has expired")]
    TokenExpired,

    #[error("Authorization header ('Bearer token') not found")]
    MissingAuthHeader,

    #[error("User not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Service temporarily unavailable")]
    BackendUnavailable(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AuthError::AlreadyExists,
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Unavailable(detail) => AuthError::BackendUnavailable(detail),
        }
    }
}

impl From<HashError> for AuthError {
    fn from(err: HashError) -> Self {
        // Hasher faults are backend faults, never credential failures
        AuthError::BackendUnavailable(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature | TokenError::WrongKind => AuthError::InvalidToken,
            TokenError::Encoding(detail) => AuthError::BackendUnavailable(detail),
        }
    }
}

/// Identity resolved from verified credentials or a verified bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub email: String,
}

/// One issued token with the metadata clients display
#[derive(Debug, Clone, Serialize)]
pub struct TokenGrant {
    pub token: String,
    pub token_type: TokenKind,
    pub expires_in: i64,
}

/// Bearer/refresh pair returned by login and refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResult {
    pub bearer_token: TokenGrant,
    pub refresh_token: TokenGrant,
}

/// Profile read result: visibility depends on who is asking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProfileView {
    Public(PublicProfile),
    Full(FullProfile),
}

/// Token issuer and account service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    codec: TokenCodec,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        codec: TokenCodec,
    ) -> Self {
        Self {
            store,
            hasher,
            codec,
        }
    }

    /// Register a new account with no refresh token set
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if self.store.find_by_email(email).await?.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hasher.hash(password)?;
        self.store.insert(email, &password_hash).await?;

        tracing::info!("Account registered: {}", email);
        Ok(())
    }

    /// Verify credentials and resolve the owning identity.
    ///
    /// Unknown email and wrong password are deliberately indistinguishable.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountIdentity, AuthError> {
        let account = match self.store.find_by_email(email).await? {
            Some(account) => account,
            None => return Err(AuthError::InvalidCredentials),
        };

        if !self.hasher.verify(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(AccountIdentity {
            email: account.email,
        })
    }

    /// Mint a bearer/refresh pair and persist the refresh member onto the
    /// account, overwriting any previous slot value
    pub async fn issue_token_pair(
        &self,
        identity: &AccountIdentity,
        bearer_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Result<TokenPairResult, AuthError> {
        let now = Utc::now().timestamp();

        let bearer = self
            .codec
            .sign(&Claims::bearer(&identity.email, now + bearer_ttl_secs))?;
        let refresh = self
            .codec
            .sign(&Claims::refresh(&identity.email, now + refresh_ttl_secs))?;

        self.store
            .update_refresh_token(&identity.email, Some(&refresh))
            .await?;

        Ok(TokenPairResult {
            bearer_token: TokenGrant {
                token: bearer,
                token_type: TokenKind::Bearer,
                expires_in: bearer_ttl_secs,
            },
            refresh_token: TokenGrant {
                token: refresh,
                token_type: TokenKind::Refresh,
                expires_in: refresh_ttl_secs,
            },
        })
    }

    /// Authenticate and issue a token pair. TTLs default to 600s bearer /
    /// 86400s refresh when the caller does not override them.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        bearer_ttl_secs: Option<i64>,
        refresh_ttl_secs: Option<i64>,
    ) -> Result<TokenPairResult, AuthError> {
        let identity = self.authenticate(email, password).await?;

        let pair = self
            .issue_token_pair(
                &identity,
                bearer_ttl_secs.unwrap_or(DEFAULT_BEARER_TTL_SECS),
                refresh_ttl_secs.unwrap_or(DEFAULT_REFRESH_TTL_SECS),
            )
            .await?;

        tracing::info!("Login succeeded: {}", identity.email);
        Ok(pair)
    }

    /// Validate a presented refresh token against the stored slot and
    /// return the owning account's email.
    ///
    /// Slot miss, signature failure, wrong kind, and a mismatched email
    /// claim all collapse to `InvalidToken`; only a genuine expiry of an
    /// otherwise-valid token surfaces as `TokenExpired`.
    async fn check_refresh_token(&self, refresh_token: &str) -> Result<String, AuthError> {
        let account = self
            .store
            .find_by_refresh_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let claims = self.codec.verify_kind(refresh_token, TokenKind::Refresh)?;

        // A stored token that names a different account is treated as if
        // the slot were empty
        if claims.email != account.email {
            return Err(AuthError::InvalidToken);
        }

        let expires_at = claims.expires_at().ok_or(AuthError::InvalidToken)?;
        if Utc::now().timestamp() > expires_at {
            return Err(AuthError::TokenExpired);
        }

        Ok(account.email)
    }

    /// Rotate a refresh token: validate it, then mint and persist a new
    /// pair with the default TTLs. The presented token is invalidated by
    /// the rotation; presenting it again fails with `InvalidToken`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPairResult, AuthError> {
        let email = self.check_refresh_token(refresh_token).await?;

        let now = Utc::now().timestamp();
        let bearer = self
            .codec
            .sign(&Claims::bearer(&email, now + DEFAULT_BEARER_TTL_SECS))?;
        let new_refresh = self
            .codec
            .sign(&Claims::refresh(&email, now + DEFAULT_REFRESH_TTL_SECS))?;

        // Compare-and-swap: a concurrent rotation of the same token wins
        // at most once
        let rotated = self
            .store
            .swap_refresh_token(&email, refresh_token, &new_refresh)
            .await?;
        if !rotated {
            return Err(AuthError::InvalidToken);
        }

        tracing::debug!("Refresh token rotated: {}", email);
        Ok(TokenPairResult {
            bearer_token: TokenGrant {
                token: bearer,
                token_type: TokenKind::Bearer,
                expires_in: DEFAULT_BEARER_TTL_SECS,
            },
            refresh_token: TokenGrant {
                token: new_refresh,
                token_type: TokenKind::Refresh,
                expires_in: DEFAULT_REFRESH_TTL_SECS,
            },
        })
    }

    /// Invalidate a refresh token by clearing the stored slot
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let email = self.check_refresh_token(refresh_token).await?;

        self.store.update_refresh_token(&email, None).await?;

        tracing::info!("Logout succeeded: {}", email);
        Ok(())
    }

    /// Read a profile. The full view is shown only when the viewer is the
    /// profile owner; everyone else gets the public subset.
    pub async fn read_profile(
        &self,
        email: &str,
        viewer: Option<&AccountIdentity>,
    ) -> Result<ProfileView, AuthError> {
        let account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let view = match viewer {
            Some(identity) if identity.email == account.email => {
                ProfileView::Full(FullProfile::from(&account))
            }
            _ => ProfileView::Public(PublicProfile::from(&account)),
        };

        Ok(view)
    }

    /// Update a profile, enforcing that the resolved identity owns the
    /// target account
    pub async fn update_profile(
        &self,
        email: &str,
        identity: &AccountIdentity,
        update: &ProfileUpdate,
    ) -> Result<FullProfile, AuthError> {
        if identity.email != email {
            return Err(AuthError::Forbidden);
        }

        let account = self.store.update_profile(email, update).await?;
        Ok(FullProfile::from(&account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::memory::MemoryCredentialStore;
    use crate::core::auth::hasher::BcryptHasher;

    const EMAIL: &str = "a@x.com";
    const PASSWORD: &str = "pw123";

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(BcryptHasher),
            TokenCodec::new("test_secret_key_for_testing_only_32bytes!"),
        )
    }

    async fn registered_service() -> AuthService {
        let service = service();
        service.register(EMAIL, PASSWORD).await.unwrap();
        service
    }

    // ========================================================================
    // Register / Authenticate Tests
    // ========================================================================

    #[tokio::test]
    async fn test_register_then_login() {
        let service = registered_service().await;

        let pair = service.login(EMAIL, PASSWORD, None, None).await.unwrap();

        assert_eq!(pair.bearer_token.token_type, TokenKind::Bearer);
        assert_eq!(pair.refresh_token.token_type, TokenKind::Refresh);
        assert_eq!(pair.bearer_token.expires_in, 600);
        assert_eq!(pair.refresh_token.expires_in, 86400);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let service = registered_service().await;

        let result = service.register(EMAIL, "other_password").await;
        assert!(matches!(result, Err(AuthError::AlreadyExists)));
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let service = registered_service().await;

        let unknown = service.authenticate("nobody@x.com", PASSWORD).await;
        let wrong = service.authenticate(EMAIL, "wrong_password").await;

        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_bearer_claims_decode_to_owner() {
        let service = registered_service().await;
        let pair = service.login(EMAIL, PASSWORD, None, None).await.unwrap();

        let codec = TokenCodec::new("test_secret_key_for_testing_only_32bytes!");
        let claims = codec
            .verify_kind(&pair.bearer_token.token, TokenKind::Bearer)
            .unwrap();

        assert_eq!(claims.email, EMAIL);
        assert_eq!(claims.token_type, TokenKind::Bearer);
        assert!(claims.bearer_exp.is_some());
    }

    #[tokio::test]
    async fn test_login_honors_ttl_overrides() {
        let service = registered_service().await;

        let pair = service
            .login(EMAIL, PASSWORD, Some(60), Some(3600))
            .await
            .unwrap();

        assert_eq!(pair.bearer_token.expires_in, 60);
        assert_eq!(pair.refresh_token.expires_in, 3600);
    }

    // ========================================================================
    // Refresh / Logout Tests
    // ========================================================================

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_the_old_token() {
        let service = registered_service().await;
        let pair = service.login(EMAIL, PASSWORD, None, None).await.unwrap();
        let old_refresh = pair.refresh_token.token.clone();

        let rotated = service.refresh(&old_refresh).await.unwrap();
        assert_ne!(rotated.refresh_token.token, old_refresh);
        // Rotation always uses the fixed defaults
        assert_eq!(rotated.bearer_token.expires_in, 600);
        assert_eq!(rotated.refresh_token.expires_in, 86400);

        // The rotated-out token no longer matches the slot
        let second = service.refresh(&old_refresh).await;
        assert!(matches!(second, Err(AuthError::InvalidToken)));

        // The new one does
        assert!(service.refresh(&rotated.refresh_token.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_with_unknown_token_fails() {
        let service = registered_service().await;

        let result = service.refresh("never.issued.token").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_with_bearer_token_in_slot_fails() {
        let codec = TokenCodec::new("test_secret_key_for_testing_only_32bytes!");
        let bearer = codec
            .sign(&Claims::bearer(EMAIL, Utc::now().timestamp() + 1000))
            .unwrap();

        // Force a bearer token into the slot; the kind check must reject it
        let store = MemoryCredentialStore::new();
        store.insert(EMAIL, "hash").await.unwrap();
        store
            .update_refresh_token(EMAIL, Some(&bearer))
            .await
            .unwrap();
        let service = AuthService::new(Arc::new(store), Arc::new(BcryptHasher), codec);

        let result = service.refresh(&bearer).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_expired_token_is_distinct() {
        let service = registered_service().await;
        // Refresh TTL in the past: the slot matches and the signature is
        // valid, only the expiry check can fail
        let pair = service
            .login(EMAIL, PASSWORD, None, Some(-10))
            .await
            .unwrap();

        let result = service.refresh(&pair.refresh_token.token).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_slot_holding_foreign_email_claim_is_invalid() {
        let codec = TokenCodec::new("test_secret_key_for_testing_only_32bytes!");

        // Valid refresh token, but signed for a different account than the
        // row holding it
        let foreign = codec
            .sign(&Claims::refresh(
                "other@x.com",
                Utc::now().timestamp() + 1000,
            ))
            .unwrap();

        let store = MemoryCredentialStore::new();
        store.insert(EMAIL, "hash").await.unwrap();
        store
            .update_refresh_token(EMAIL, Some(&foreign))
            .await
            .unwrap();
        let service = AuthService::new(Arc::new(store), Arc::new(BcryptHasher), codec);

        let result = service.refresh(&foreign).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_logout_clears_slot_and_second_logout_fails() {
        let service = registered_service().await;
        let pair = service.login(EMAIL, PASSWORD, None, None).await.unwrap();
        let refresh = pair.refresh_token.token;

        service.logout(&refresh).await.unwrap();

        let second = service.logout(&refresh).await;
        assert!(matches!(second, Err(AuthError::InvalidToken)));

        // The cleared slot also rejects refresh
        let refreshed = service.refresh(&refresh).await;
        assert!(matches!(refreshed, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_login_after_logout_issues_fresh_pair() {
        let service = registered_service().await;
        let pair = service.login(EMAIL, PASSWORD, None, None).await.unwrap();
        service.logout(&pair.refresh_token.token).await.unwrap();

        let pair = service.login(EMAIL, PASSWORD, None, None).await.unwrap();
        assert!(service.refresh(&pair.refresh_token.token).await.is_ok());
    }

    // ========================================================================
    // Profile Tests
    // ========================================================================

    fn profile_update() -> ProfileUpdate {
        ProfileUpdate {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            dob: "1815-12-10".to_string(),
            address: "12 St James's Square".to_string(),
        }
    }

    #[tokio::test]
    async fn test_read_profile_visibility() {
        let service = registered_service().await;
        let owner = AccountIdentity {
            email: EMAIL.to_string(),
        };
        service
            .update_profile(EMAIL, &owner, &profile_update())
            .await
            .unwrap();

        // Anonymous: public subset
        let view = service.read_profile(EMAIL, None).await.unwrap();
        assert!(matches!(view, ProfileView::Public(_)));

        // Another authenticated account: still the public subset
        let other = AccountIdentity {
            email: "other@x.com".to_string(),
        };
        let view = service.read_profile(EMAIL, Some(&other)).await.unwrap();
        assert!(matches!(view, ProfileView::Public(_)));

        // The owner: full view
        let view = service.read_profile(EMAIL, Some(&owner)).await.unwrap();
        match view {
            ProfileView::Full(profile) => {
                assert_eq!(profile.dob.as_deref(), Some("1815-12-10"));
            }
            other => panic!("expected full view, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_profile_unknown_email_not_found() {
        let service = registered_service().await;

        let result = service.read_profile("nobody@x.com", None).await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_profile_enforces_ownership() {
        let service = registered_service().await;
        let intruder = AccountIdentity {
            email: "other@x.com".to_string(),
        };

        let result = service
            .update_profile(EMAIL, &intruder, &profile_update())
            .await;
        assert!(matches!(result, Err(AuthError::Forbidden)));
    }

    #[tokio::test]
    async fn test_update_profile_returns_full_view() {
        let service = registered_service().await;
        let owner = AccountIdentity {
            email: EMAIL.to_string(),
        };

        let profile = service
            .update_profile(EMAIL, &owner, &profile_update())
            .await
            .unwrap();

        assert_eq!(profile.email, EMAIL);
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
        assert_eq!(profile.address.as_deref(), Some("12 St James's Square"));
    }

    // ========================================================================
    // Error Conversion Tests
    // ========================================================================

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(
            format!("{}", AuthError::InvalidCredentials),
            "Incorrect email or password"
        );
        assert_eq!(format!("{}", AuthError::AlreadyExists), "User already exists");
        assert_eq!(format!("{}", AuthError::InvalidToken), "Invalid JWT token");
        assert_eq!(
            format!("{}", AuthError::TokenExpired),
            "JWT token has expired"
        );
        assert_eq!(
            format!("{}", AuthError::MissingAuthHeader),
            "Authorization header ('Bearer token') not found"
        );
    }

    #[test]
    fn test_store_error_conversions() {
        let err: AuthError = StoreError::Conflict.into();
        assert!(matches!(err, AuthError::AlreadyExists));

        let err: AuthError = StoreError::NotFound.into();
        assert!(matches!(err, AuthError::NotFound));

        let err: AuthError = StoreError::Unavailable("down".to_string()).into();
        assert!(matches!(err, AuthError::BackendUnavailable(_)));
    }

    #[test]
    fn test_token_error_conversions_are_coarse() {
        let err: AuthError = TokenError::InvalidSignature.into();
        assert!(matches!(err, AuthError::InvalidToken));

        // Wrong kind is not distinguished externally
        let err: AuthError = TokenError::WrongKind.into();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn test_hasher_fault_is_not_invalid_credentials() {
        let err: AuthError = HashError::Hashing("boom".to_string()).into();
        assert!(matches!(err, AuthError::BackendUnavailable(_)));
    }
}
