//! Refresh token persistence.
//!
//! - [`RefreshTokenStore`] - the contract every backend implements
//! - [`InMemoryRefreshTokenStore`] - process-local backend for tests and embedding
//!
//! # Implementations
//!
//! Durable storage lives in separate crates:
//!
//! - `duelgate-auth-postgres` - PostgreSQL storage backend

pub mod memory;
pub mod refresh_token;

pub use memory::InMemoryRefreshTokenStore;
pub use refresh_token::{RefreshTokenStore, RefreshTokenTransaction};
