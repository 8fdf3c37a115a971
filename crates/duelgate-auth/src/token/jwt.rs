//! Access token issuance and validation.
//!
//! Access tokens are compact HS256 JWTs signed with the configured symmetric
//! secret. They are never persisted; validity is purely a function of the
//! signature, issuer, audience and expiry.
//!
//! ## Example
//!
//! ```ignore
//! use duelgate_auth::token::jwt::AccessTokenIssuer;
//!
//! let issuer = AccessTokenIssuer::from_config(&config)?;
//! let access = issuer.issue(&identity, OffsetDateTime::now_utc())?;
//! let claims = issuer.verify(&access.token)?;
//! ```

use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::config::{AuthConfig, SigningConfig};
use crate::error::AuthError;
use crate::types::AccountIdentity;
use crate::validation;

/// Clock skew tolerated when validating `exp`, in seconds.
pub const VALIDATION_LEEWAY_SECS: u64 = 60;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while validating an access token.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidKeyFormat => Self::invalid_key(err.to_string()),
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError { message } | JwtError::InvalidKey { message } => {
                AuthError::internal(message)
            }
            other => AuthError::invalid_token(other.to_string()),
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (account id).
    pub sub: String,

    /// Audience.
    pub aud: String,

    /// Expiration (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Unique per issuance.
    pub jti: String,

    /// Account email, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// One entry per role.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AccessTokenClaims {
    /// Returns `true` if the account holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Compact JWT.
    pub token: String,

    /// The token's `jti`.
    pub jti: String,

    /// When the token expires.
    pub expires_at: OffsetDateTime,
}

// ============================================================================
// Issuer
// ============================================================================

/// Stateless access token issuer.
///
/// Holds the signing key for its whole lifetime; construct once at startup
/// and share behind an `Arc`.
pub struct AccessTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl fmt::Debug for AccessTokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl AccessTokenIssuer {
    /// Creates an issuer from the signing section and an access token lifetime.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the secret is missing or shorter than 32
    /// bytes, issuer or audience is empty, or the lifetime is not positive.
    pub fn new(signing: &SigningConfig, lifetime: Duration) -> AuthResult<Self> {
        signing.validate()?;
        if !lifetime.is_positive() {
            return Err(AuthError::configuration(
                "access token lifetime must be > 0",
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(signing.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing.secret.as_bytes()),
            issuer: signing.issuer.clone(),
            audience: signing.audience.clone(),
            lifetime,
        })
    }

    /// Creates an issuer from the full auth configuration.
    ///
    /// # Errors
    ///
    /// See [`AccessTokenIssuer::new`].
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        Self::new(&config.signing, config.tokens.access_token_lifetime())
    }

    /// Signs a new access token for `identity`, valid from `now`.
    ///
    /// Identical inputs produce identical claims except for `jti`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty account id, `Internal` if signing fails.
    pub fn issue(&self, identity: &AccountIdentity, now: OffsetDateTime) -> AuthResult<AccessToken> {
        let account_id = validation::require_non_empty("account_id", &identity.account_id)?;
        let expires_at = now
            .checked_add(self.lifetime)
            .ok_or_else(|| AuthError::internal("access token expiry is out of range"))?;

        let claims = AccessTokenClaims {
            iss: self.issuer.clone(),
            sub: account_id.to_string(),
            aud: self.audience.clone(),
            exp: expires_at.unix_timestamp(),
            iat: now.unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
            email: identity.email.clone(),
            roles: identity.roles.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("Failed to sign access token: {e}")))?;

        Ok(AccessToken {
            token,
            jti: claims.jti,
            expires_at,
        })
    }

    /// Validates signature, issuer, audience and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns a `JwtError` describing why the token was rejected.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.leeway = VALIDATION_LEEWAY_SECS;

        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Access token lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningSecret;
    use crate::error::ErrorKind;

    const SECRET: &str = "an-hs256-secret-of-at-least-32-bytes!";

    fn signing(audience: &str) -> SigningConfig {
        SigningConfig {
            secret: SigningSecret::new(SECRET),
            issuer: "duelgate".to_string(),
            audience: audience.to_string(),
        }
    }

    fn issuer() -> AccessTokenIssuer {
        AccessTokenIssuer::new(&signing("duelgate-web"), Duration::minutes(15)).unwrap()
    }

    fn player() -> AccountIdentity {
        AccountIdentity::new("acc-1")
            .with_email("duelist@example.com")
            .with_roles(["Player", "Judge"])
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let now = OffsetDateTime::now_utc();
        let access = issuer.issue(&player(), now).unwrap();

        assert_eq!(access.token.split('.').count(), 3);
        assert_eq!(access.expires_at, now + Duration::minutes(15));

        let claims = issuer.verify(&access.token).unwrap();
        assert_eq!(claims.sub, "acc-1");
        assert_eq!(claims.iss, "duelgate");
        assert_eq!(claims.aud, "duelgate-web");
        assert_eq!(claims.jti, access.jti);
        assert_eq!(claims.email.as_deref(), Some("duelist@example.com"));
        assert_eq!(claims.roles, vec!["Player", "Judge"]);
        assert!(claims.has_role("Judge"));
        assert_eq!(claims.iat, now.unix_timestamp());
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_same_subject_distinct_jti() {
        let issuer = issuer();
        let now = OffsetDateTime::now_utc();
        let first = issuer.verify(&issuer.issue(&player(), now).unwrap().token).unwrap();
        let second = issuer.verify(&issuer.issue(&player(), now).unwrap().token).unwrap();

        assert_eq!(first.sub, second.sub);
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_no_roles_no_email() {
        let issuer = issuer();
        let access = issuer
            .issue(&AccountIdentity::new("acc-2"), OffsetDateTime::now_utc())
            .unwrap();
        let claims = issuer.verify(&access.token).unwrap();

        assert!(claims.roles.is_empty());
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_empty_account_id_rejected() {
        let err = issuer()
            .issue(&AccountIdentity::new(""), OffsetDateTime::now_utc())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_expired_token() {
        let issuer = issuer();
        let issued_at = OffsetDateTime::now_utc() - Duration::hours(2);
        let access = issuer.issue(&player(), issued_at).unwrap();

        assert!(matches!(issuer.verify(&access.token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_expiry_within_leeway_accepted() {
        let issuer = issuer();
        let issued_at = OffsetDateTime::now_utc() - Duration::minutes(15) - Duration::seconds(20);
        let access = issuer.issue(&player(), issued_at).unwrap();

        assert!(issuer.verify(&access.token).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let mut other = signing("duelgate-web");
        other.secret = SigningSecret::new("a-completely-different-32-byte-secret");
        let other = AccessTokenIssuer::new(&other, Duration::minutes(15)).unwrap();

        let access = issuer().issue(&player(), OffsetDateTime::now_utc()).unwrap();
        assert!(matches!(
            other.verify(&access.token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let other = AccessTokenIssuer::new(&signing("admin-portal"), Duration::minutes(15)).unwrap();
        let access = issuer().issue(&player(), OffsetDateTime::now_utc()).unwrap();

        assert!(matches!(
            other.verify(&access.token),
            Err(JwtError::InvalidClaims { .. })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            issuer().verify("not-a-jwt"),
            Err(JwtError::DecodingError { .. })
        ));
    }

    #[test]
    fn test_construction_requires_valid_config() {
        let mut short = signing("duelgate-web");
        short.secret = SigningSecret::new("short");
        let err = AccessTokenIssuer::new(&short, Duration::minutes(15)).unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));

        let err = AccessTokenIssuer::new(&signing("duelgate-web"), Duration::ZERO).unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }

    #[test]
    fn test_unrepresentable_expiry_is_internal_error() {
        let issuer = AccessTokenIssuer::new(
            &signing("duelgate-web"),
            Duration::minutes(i64::from(u32::MAX)),
        )
        .unwrap();
        let err = issuer
            .issue(&player(), OffsetDateTime::now_utc())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_jwt_error_maps_to_invalid_token() {
        let err: AuthError = JwtError::Expired.into();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);

        let err: AuthError = JwtError::encoding_error("boom").into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_debug_hides_keys() {
        let rendered = format!("{:?}", issuer());
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("duelgate-web"));
    }
}
