//! Argument checks shared by every entry point.
//!
//! Failures here are always [`AuthError::InvalidInput`] and happen before any
//! storage access.

use std::net::IpAddr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::AuthResult;
use crate::error::AuthError;

/// Shortest refresh token accepted on the wire.
pub const MIN_REFRESH_TOKEN_LEN: usize = 20;

/// Longest refresh token accepted on the wire.
pub const MAX_REFRESH_TOKEN_LEN: usize = 500;

/// Rejects empty or whitespace-only values, returning the trimmed value.
pub fn require_non_empty<'a>(field: &str, value: &'a str) -> AuthResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::invalid_input(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Parses a client address and returns its canonical text form.
///
/// Both IPv4 and IPv6 literals are accepted. Canonicalizing keeps
/// `::1` and `0:0:0:0:0:0:0:1` from comparing unequal during rotation.
pub fn normalize_ip(ip: &str) -> AuthResult<String> {
    let ip = require_non_empty("ip", ip)?;
    ip.parse::<IpAddr>()
        .map(|addr| addr.to_canonical().to_string())
        .map_err(|_| AuthError::invalid_input(format!("'{ip}' is not an IP address")))
}

/// Checks that a refresh token looks like one we could have issued.
pub fn refresh_token_format(token: &str) -> AuthResult<&str> {
    let token = require_non_empty("refresh token", token)?;

    if !(MIN_REFRESH_TOKEN_LEN..=MAX_REFRESH_TOKEN_LEN).contains(&token.len()) {
        return Err(AuthError::invalid_input(format!(
            "refresh token must be between {MIN_REFRESH_TOKEN_LEN} and {MAX_REFRESH_TOKEN_LEN} characters"
        )));
    }

    if STANDARD.decode(token).is_err() {
        return Err(AuthError::invalid_input(
            "refresh token is not valid base64",
        ));
    }

    Ok(token)
}
