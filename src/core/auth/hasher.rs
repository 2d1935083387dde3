//! Password hashing contract and the bcrypt implementation.
//!
//! The hash algorithm is an injectable policy: the rest of the crate only
//! sees the `PasswordHasher` trait.

/// Cost factor for bcrypt hashing (12 is recommended for production)
const BCRYPT_COST: u32 = 12;

/// Password hashing errors
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// One-way salted password hashing.
///
/// Implementations must be slow and salted; plain digests do not qualify.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into an opaque string
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// Verify a plaintext password against a previously produced hash
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, HashError>;
}

/// Bcrypt-backed hasher with automatic salt generation
#[derive(Debug, Clone, Default)]
pub struct BcryptHasher;

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        bcrypt::hash(plaintext, BCRYPT_COST).map_err(|e| HashError::Hashing(e.to_string()))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, HashError> {
        bcrypt::verify(plaintext, hash).map_err(|e| HashError::Hashing(e.to_string()))
    }
}
