//! Account model and its response views.
//!
//! The account row is keyed by email. The password hash and the refresh
//! token slot are never serialized; API responses go through the profile
//! view structs instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Registered account as stored in the `users` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Single rotating refresh-token slot; overwritten on every successful
    /// login/refresh, cleared on logout
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile fields set by the authenticated profile-update operation.
/// All four fields are required on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub address: String,
}

/// Profile view shown to anonymous callers and to accounts other than the
/// profile owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Profile view shown to the owning account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullProfile {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub address: Option<String>,
}

impl From<&UserAccount> for PublicProfile {
    fn from(account: &UserAccount) -> Self {
        Self {
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
        }
    }
}

impl From<&UserAccount> for FullProfile {
    fn from(account: &UserAccount) -> Self {
        Self {
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            dob: account.dob.clone(),
            address: account.address.clone(),
        }
    }
}
