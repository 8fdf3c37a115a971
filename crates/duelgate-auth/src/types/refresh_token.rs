//! Refresh token domain type.
//!
//! This is the only persisted entity. A record is created active, mutated at
//! most once (revocation, which is terminal) and otherwise left alone. Rows
//! are only ever deleted when a stale, unrevoked row blocks a new login for
//! the same account.
//!
//! # Security
//!
//! - Token values are 64 random bytes from the OS generator
//! - Each token is bound to the address that requested it
//! - Revocation records who revoked it and, for rotation, the successor

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::error::AuthError;

/// Number of random bytes behind a refresh token value.
pub const TOKEN_BYTES: usize = 64;

/// Refresh token stored by a [`RefreshTokenStore`](crate::storage::RefreshTokenStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Opaque token value, also the primary key.
    pub token: String,

    /// Owning account.
    pub account_id: String,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Address that requested the token.
    pub created_by_ip: String,

    /// When this token was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,

    /// Address that revoked the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_by_ip: Option<String>,

    /// Successor token when revoked by rotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by_token: Option<String>,
}

/// Lifecycle state of a refresh token at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    /// Usable for rotation.
    Active,
    /// Past its expiry, never revoked.
    Expired,
    /// Revoked because it was exchanged for a successor.
    RevokedByRotation,
    /// Revoked by logout or an administrator.
    RevokedManually,
}

impl std::fmt::Display for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
            Self::RevokedByRotation => write!(f, "rotated"),
            Self::RevokedManually => write!(f, "revoked"),
        }
    }
}

impl RefreshToken {
    /// Builds a fresh, active record with a newly generated token value.
    ///
    /// # Errors
    ///
    /// `Internal` if `now + lifetime` is not a representable date.
    pub fn issue(
        account_id: impl Into<String>,
        created_by_ip: impl Into<String>,
        now: OffsetDateTime,
        lifetime: Duration,
    ) -> AuthResult<Self> {
        let expires_at = now
            .checked_add(lifetime)
            .ok_or_else(|| AuthError::internal("refresh token expiry is out of range"))?;

        Ok(Self {
            token: Self::generate_token(),
            account_id: account_id.into(),
            created_at: now,
            expires_at,
            created_by_ip: created_by_ip.into(),
            revoked_at: None,
            revoked_by_ip: None,
            replaced_by_token: None,
        })
    }

    /// Returns `true` if this token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if the token is neither revoked nor expired at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        !self.is_revoked() && !self.is_expired_at(now)
    }

    /// Returns `true` if the token is neither revoked nor expired.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active_at(OffsetDateTime::now_utc())
    }

    /// Classifies the token at `now`. Revocation wins over expiry.
    #[must_use]
    pub fn state_at(&self, now: OffsetDateTime) -> TokenState {
        match (&self.revoked_at, &self.replaced_by_token) {
            (Some(_), Some(_)) => TokenState::RevokedByRotation,
            (Some(_), None) => TokenState::RevokedManually,
            (None, _) if self.is_expired_at(now) => TokenState::Expired,
            (None, _) => TokenState::Active,
        }
    }

    /// Marks the token revoked. Only the revocation fields change.
    pub fn revoke(
        &mut self,
        now: OffsetDateTime,
        revoked_by_ip: impl Into<String>,
        replaced_by_token: Option<String>,
    ) {
        self.revoked_at = Some(now);
        self.revoked_by_ip = Some(revoked_by_ip.into());
        self.replaced_by_token = replaced_by_token;
    }

    /// Generate a cryptographically secure random token.
    ///
    /// Returns 64 random bytes encoded as standard padded base64 (88 characters).
    #[must_use]
    pub fn generate_token() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;
        use rand::RngCore;

        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        STANDARD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_token(expires_in: Duration) -> RefreshToken {
        RefreshToken::issue("acc-1", "1.1.1.1", OffsetDateTime::now_utc(), expires_in).unwrap()
    }

    #[test]
    fn test_generate_token() {
        let token = RefreshToken::generate_token();

        // 64 bytes standard base64 = 88 characters, one padding char
        assert_eq!(token.len(), 88);
        assert!(token.ends_with('='));
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
        );
    }

    #[test]
    fn test_generate_token_uniqueness() {
        let tokens: Vec<String> = (0..100).map(|_| RefreshToken::generate_token()).collect();

        let mut unique = tokens.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(tokens.len(), unique.len());
    }

    #[test]
    fn test_issue() {
        let now = OffsetDateTime::now_utc();
        let token = RefreshToken::issue("acc-1", "1.1.1.1", now, Duration::days(7)).unwrap();

        assert_eq!(token.account_id, "acc-1");
        assert_eq!(token.created_by_ip, "1.1.1.1");
        assert_eq!(token.created_at, now);
        assert_eq!(token.expires_at, now + Duration::days(7));
        assert!(token.is_active_at(now));
    }

    #[test]
    fn test_issue_with_unrepresentable_expiry() {
        let err = RefreshToken::issue(
            "acc-1",
            "1.1.1.1",
            OffsetDateTime::now_utc(),
            Duration::days(i64::from(u32::MAX)),
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let now = OffsetDateTime::now_utc();
        let token = RefreshToken::issue("acc-1", "1.1.1.1", now, Duration::hours(1)).unwrap();

        assert!(!token.is_expired_at(now + Duration::minutes(59)));
        assert!(token.is_expired_at(now + Duration::hours(1)));
        assert!(!token.is_active_at(now + Duration::hours(1)));
    }

    #[test]
    fn test_is_active() {
        assert!(create_test_token(Duration::hours(1)).is_active());
        assert!(!create_test_token(Duration::minutes(-1)).is_active());

        let mut revoked = create_test_token(Duration::hours(1));
        revoked.revoke(OffsetDateTime::now_utc(), "1.1.1.1", None);
        assert!(revoked.is_revoked());
        assert!(!revoked.is_active());
    }

    #[test]
    fn test_states() {
        let now = OffsetDateTime::now_utc();

        let token = create_test_token(Duration::hours(1));
        assert_eq!(token.state_at(now), TokenState::Active);
        assert_eq!(token.state_at(now + Duration::hours(2)), TokenState::Expired);

        let mut rotated = token.clone();
        rotated.revoke(now, "1.1.1.1", Some("next".to_string()));
        assert_eq!(rotated.state_at(now), TokenState::RevokedByRotation);

        let mut revoked = token;
        revoked.revoke(now, "2.2.2.2", None);
        assert_eq!(revoked.state_at(now), TokenState::RevokedManually);
        assert_eq!(revoked.revoked_by_ip.as_deref(), Some("2.2.2.2"));
        // revoked beats expired
        assert_eq!(
            revoked.state_at(now + Duration::hours(2)),
            TokenState::RevokedManually
        );
    }

    #[test]
    fn test_serialization() {
        let token = create_test_token(Duration::hours(1));
        let json = serde_json::to_value(&token).unwrap();

        assert_eq!(json["accountId"], "acc-1");
        assert_eq!(json["createdByIp"], "1.1.1.1");
        assert!(json.get("revokedAt").is_none());
        assert!(json.get("replacedByToken").is_none());

        let back: RefreshToken = serde_json::from_value(json).unwrap();
        assert_eq!(back.token, token.token);
    }
}
