//! Credential store: the narrow persistence interface the auth core
//! depends on, plus its PostgreSQL implementation.
//!
//! The auth service only ever sees the `CredentialStore` trait; swapping
//! the backend (Postgres in production, the in-memory store in tests)
//! never touches the token lifecycle logic.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::db::models::{ProfileUpdate, UserAccount};

/// Credential store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Account already exists")]
    Conflict,

    #[error("Account not found")]
    NotFound,

    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Narrow persistence interface consumed by the auth core.
///
/// Implementations must keep a single account's refresh-token slot
/// read-modify-write consistent: of two concurrent `swap_refresh_token`
/// calls presenting the same `current` value, at most one may succeed.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an account by email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Look up the account whose refresh-token slot holds exactly `token`
    async fn find_by_refresh_token(&self, token: &str)
    -> Result<Option<UserAccount>, StoreError>;

    /// Create an account with no refresh token and no profile fields.
    /// Fails with `Conflict` if the email is already registered.
    async fn insert(&self, email: &str, password_hash: &str) -> Result<(), StoreError>;

    /// Overwrite the refresh-token slot (`None` clears it)
    async fn update_refresh_token(
        &self,
        email: &str,
        token: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Replace the refresh-token slot with `next` only if it still holds
    /// `current`. Returns whether the swap happened.
    async fn swap_refresh_token(
        &self,
        email: &str,
        current: &str,
        next: &str,
    ) -> Result<bool, StoreError>;

    /// Replace the profile fields of an account and return the updated row
    async fn update_profile(
        &self,
        email: &str,
        profile: &ProfileUpdate,
    ) -> Result<UserAccount, StoreError>;
}

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a store over an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let account = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT email, password_hash, refresh_token, first_name, last_name, dob, address, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        let account = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT email, password_hash, refresh_token, first_name, last_name, dob, address, created_at
            FROM users
            WHERE refresh_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<(), StoreError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(StoreError::Conflict);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        // Lost a race with a concurrent registration for the same email
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }

        Ok(())
    }

    async fn update_refresh_token(
        &self,
        email: &str,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $2
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(token)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        email: &str,
        current: &str,
        next: &str,
    ) -> Result<bool, StoreError> {
        // Compare-and-swap on the slot: a concurrent rotation of the same
        // token leaves rows_affected == 0 for the loser.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $3
            WHERE email = $1 AND refresh_token = $2
            "#,
        )
        .bind(email)
        .bind(current)
        .bind(next)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(
        &self,
        email: &str,
        profile: &ProfileUpdate,
    ) -> Result<UserAccount, StoreError> {
        let account = sqlx::query_as::<_, UserAccount>(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, dob = $4, address = $5
            WHERE email = $1
            RETURNING email, password_hash, refresh_token, first_name, last_name, dob, address, created_at
            "#,
        )
        .bind(email)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.dob)
        .bind(&profile.address)
        .fetch_optional(&self.pool)
        .await?;

        account.ok_or(StoreError::NotFound)
    }
}
