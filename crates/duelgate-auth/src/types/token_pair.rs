//! Access/refresh token pair returned by login and refresh.

use serde::Serialize;
use time::OffsetDateTime;

/// Credentials handed back to the transport layer.
///
/// The expiry instants let callers set cookie lifetimes that match the
/// backend's own lifetimes instead of hardcoding them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Signed compact JWT.
    pub access_token: String,

    /// When the access token stops validating.
    #[serde(with = "time::serde::rfc3339")]
    pub access_token_expires_at: OffsetDateTime,

    /// Opaque refresh token value.
    pub refresh_token: String,

    /// When the refresh token expires unless rotated or revoked first.
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_token_expires_at: OffsetDateTime,
}
