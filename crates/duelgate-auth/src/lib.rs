//! # duelgate-auth
//!
//! Session credentials for duelgate accounts.
//!
//! This crate provides:
//! - Short-lived signed access tokens (HS256 JWT)
//! - Long-lived refresh tokens bound to the address that requested them
//! - Rotation with a single active refresh token per account
//! - Explicit and administrative revocation
//!
//! ## Overview
//!
//! An external identity provider verifies credentials and hands a verified
//! [`AccountIdentity`] to the [`AuthenticationCoordinator`], which pairs a
//! fresh access token with a refresh token. Refresh tokens are persisted
//! through the [`RefreshTokenStore`] contract; the storage backend's filtered
//! unique index on unrevoked rows is what keeps concurrent logins and
//! rotations for one account from producing two live sessions.
//!
//! ## Modules
//!
//! - [`config`] - Signing and lifetime configuration
//! - [`error`] - Error taxonomy shared by every operation
//! - [`identity`] - Account lookup collaborator
//! - [`storage`] - Refresh token persistence contract and in-memory backend
//! - [`token`] - Issuance, rotation, revocation and the coordinator
//! - [`types`] - Domain records
//! - [`validation`] - Argument checks applied at every entry point

pub mod config;
pub mod error;
pub mod identity;
pub mod storage;
pub mod token;
pub mod types;
pub mod validation;

pub use config::{AuthConfig, ConfigError, SigningConfig, SigningSecret, TokenLifetimes};
pub use error::{AuthError, ErrorKind};
pub use identity::{AccountDirectory, StaticAccountDirectory};
pub use storage::{InMemoryRefreshTokenStore, RefreshTokenStore, RefreshTokenTransaction};
pub use token::{
    AccessToken, AccessTokenClaims, AccessTokenIssuer, AuthenticationCoordinator, JwtError,
    RevocationEnforcer, RotationCoordinator,
};
pub use types::{AccountIdentity, RefreshToken, TokenPair, TokenState};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::AuthConfig;
    pub use crate::error::{AuthError, ErrorKind};
    pub use crate::identity::AccountDirectory;
    pub use crate::storage::{RefreshTokenStore, RefreshTokenTransaction};
    pub use crate::token::AuthenticationCoordinator;
    pub use crate::types::{AccountIdentity, RefreshToken, TokenPair};
}
