//! Domain types shared across the crate.
//!
//! - [`RefreshToken`] - The persisted refresh token record
//! - [`AccountIdentity`] - A verified account as handed over by the identity provider
//! - [`TokenPair`] - What login and refresh return to the transport layer

pub mod identity;
pub mod refresh_token;
pub mod token_pair;

pub use identity::AccountIdentity;
pub use refresh_token::{RefreshToken, TokenState};
pub use token_pair::TokenPair;
