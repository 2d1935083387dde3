//! Persistence layer: account model, credential store interface, and the
//! PostgreSQL and in-memory store implementations.

pub mod memory;
pub mod models;
pub mod pool;
pub mod store;

pub use memory::MemoryCredentialStore;
pub use models::{FullProfile, ProfileUpdate, PublicProfile, UserAccount};
pub use pool::{DbConfig, DbError, create_pool, create_pool_with_migrations, health_check};
pub use store::{CredentialStore, PgCredentialStore, StoreError};

// Re-export sqlx types that might be needed
pub use sqlx::PgPool;
