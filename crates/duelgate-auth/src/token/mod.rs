//! Token issuance, rotation and revocation.
//!
//! This module provides:
//!
//! - Access token signing and validation ([`jwt`])
//! - Refresh token creation and rotation ([`rotation`])
//! - Refresh token revocation ([`revocation`])
//! - The login/refresh coordinator ([`service`])

pub mod jwt;
pub mod revocation;
pub mod rotation;
pub mod service;

pub use jwt::{AccessToken, AccessTokenClaims, AccessTokenIssuer, JwtError};
pub use revocation::RevocationEnforcer;
pub use rotation::RotationCoordinator;
pub use service::AuthenticationCoordinator;
