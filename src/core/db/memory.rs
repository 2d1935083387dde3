//! In-memory credential store.
//!
//! Implements the same `CredentialStore` contract as the PostgreSQL store
//! over a mutex-guarded map. Used by the test suites and for running the
//! service without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::core::db::models::{ProfileUpdate, UserAccount};
use crate::core::db::store::{CredentialStore, StoreError};

/// Mutex-guarded map of accounts keyed by email
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: Mutex<HashMap<String, UserAccount>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.get(email).cloned())
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .values()
            .find(|a| a.refresh_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().unwrap();

        if accounts.contains_key(email) {
            return Err(StoreError::Conflict);
        }

        accounts.insert(
            email.to_string(),
            UserAccount {
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                refresh_token: None,
                first_name: None,
                last_name: None,
                dob: None,
                address: None,
                created_at: Utc::now(),
            },
        );

        Ok(())
    }

    async fn update_refresh_token(
        &self,
        email: &str,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(email).ok_or(StoreError::NotFound)?;

        account.refresh_token = token.map(str::to_string);
        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        email: &str,
        current: &str,
        next: &str,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(email).ok_or(StoreError::NotFound)?;

        // Same compare-and-swap semantics as the SQL store, under the lock
        if account.refresh_token.as_deref() != Some(current) {
            return Ok(false);
        }

        account.refresh_token = Some(next.to_string());
        Ok(true)
    }

    async fn update_profile(
        &self,
        email: &str,
        profile: &ProfileUpdate,
    ) -> Result<UserAccount, StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(email).ok_or(StoreError::NotFound)?;

        account.first_name = Some(profile.first_name.clone());
        account.last_name = Some(profile.last_name.clone());
        account.dob = Some(profile.dob.clone());
        account.address = Some(profile.address.clone());

        Ok(account.clone())
    }
}
