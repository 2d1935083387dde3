//! Cinevault, the account and token service backing a movie catalog API.
//!
//! Authenticates callers with short-lived bearer tokens backed by
//! longer-lived rotating refresh tokens, and exposes the profile endpoints
//! gated on token presence and validity.

pub mod core;
