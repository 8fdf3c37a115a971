//! Authentication configuration.
//!
//! Loaded once at startup and immutable afterwards. Missing or invalid values
//! are fatal: [`AuthConfig::validate`] runs before any component is built.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Minimum length of the HMAC signing secret, in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

/// Longest accepted access token lifetime (one year).
pub const MAX_ACCESS_TOKEN_LIFETIME_MINUTES: u32 = 525_600;

/// Longest accepted refresh token lifetime (ten years).
pub const MAX_REFRESH_TOKEN_LIFETIME_DAYS: u32 = 3650;

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// operation_timeout = "10s"
///
/// [auth.signing]
/// secret = "use `duelgate generate-secret` to create one"
/// issuer = "duelgate"
/// audience = "duelgate-web"
///
/// [auth.tokens]
/// access_token_lifetime_minutes = 15
/// refresh_token_lifetime_days = 7
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Access token signing configuration.
    pub signing: SigningConfig,

    /// Token lifetimes.
    pub tokens: TokenLifetimes,

    /// Upper bound for a single coordinator operation, storage round-trips
    /// included.
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing: SigningConfig::default(),
            tokens: TokenLifetimes::default(),
            operation_timeout: Duration::from_secs(10),
        }
    }
}

/// Access token signing configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Symmetric HMAC-SHA256 secret.
    pub secret: SigningSecret,

    /// Value of the `iss` claim.
    pub issuer: String,

    /// Value of the `aud` claim.
    pub audience: String,
}

/// Token lifetimes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenLifetimes {
    /// Access token validity window in minutes.
    pub access_token_lifetime_minutes: u32,

    /// Refresh token validity window in days.
    pub refresh_token_lifetime_days: u32,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access_token_lifetime_minutes: 15,
            refresh_token_lifetime_days: 7,
        }
    }
}

impl TokenLifetimes {
    /// Access token lifetime as a `time` duration.
    #[must_use]
    pub fn access_token_lifetime(&self) -> time::Duration {
        time::Duration::minutes(i64::from(self.access_token_lifetime_minutes))
    }

    /// Refresh token lifetime as a `time` duration.
    #[must_use]
    pub fn refresh_token_lifetime(&self) -> time::Duration {
        time::Duration::days(i64::from(self.refresh_token_lifetime_days))
    }
}

/// HMAC signing secret. Never printed.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SigningSecret(String);

impl SigningSecret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret bytes used as the HMAC key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns `true` if no secret was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl SigningConfig {
    /// Validates the signing section on its own.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Missing("signing.secret".to_string()));
        }

        if self.secret.as_bytes().len() < MIN_SECRET_BYTES {
            return Err(ConfigError::InvalidValue(format!(
                "signing.secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Missing("signing.issuer".to_string()));
        }

        if self.audience.trim().is_empty() {
            return Err(ConfigError::Missing("signing.audience".to_string()));
        }

        Ok(())
    }
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signing.validate()?;

        if self.tokens.access_token_lifetime_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "tokens.access_token_lifetime_minutes must be > 0".to_string(),
            ));
        }

        if self.tokens.access_token_lifetime_minutes > MAX_ACCESS_TOKEN_LIFETIME_MINUTES {
            return Err(ConfigError::InvalidValue(format!(
                "tokens.access_token_lifetime_minutes must be <= {MAX_ACCESS_TOKEN_LIFETIME_MINUTES}"
            )));
        }

        if self.tokens.refresh_token_lifetime_days == 0 {
            return Err(ConfigError::InvalidValue(
                "tokens.refresh_token_lifetime_days must be > 0".to_string(),
            ));
        }

        if self.tokens.refresh_token_lifetime_days > MAX_REFRESH_TOKEN_LIFETIME_DAYS {
            return Err(ConfigError::InvalidValue(format!(
                "tokens.refresh_token_lifetime_days must be <= {MAX_REFRESH_TOKEN_LIFETIME_DAYS}"
            )));
        }

        if self.operation_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "operation_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AuthConfig {
        AuthConfig {
            signing: SigningConfig {
                secret: SigningSecret::new("0123456789abcdef0123456789abcdef"),
                issuer: "duelgate".to_string(),
                audience: "duelgate-web".to_string(),
            },
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.tokens.access_token_lifetime_minutes, 15);
        assert_eq!(config.tokens.refresh_token_lifetime_days, 7);
        assert_eq!(config.operation_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_default_config_requires_secret() {
        let err = AuthConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("signing.secret"));
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = valid_config();
        config.signing.secret = SigningSecret::new("too-short");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn test_empty_issuer_and_audience_rejected() {
        let mut config = valid_config();
        config.signing.issuer = "  ".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("issuer"));

        let mut config = valid_config();
        config.signing.audience = String::new();
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("audience")
        );
    }

    #[test]
    fn test_zero_lifetimes_rejected() {
        let mut config = valid_config();
        config.tokens.access_token_lifetime_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.tokens.refresh_token_lifetime_days = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.operation_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_lifetimes_rejected() {
        let mut config = valid_config();
        config.tokens.access_token_lifetime_minutes = u32::MAX;
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("access_token_lifetime_minutes")
        );

        let mut config = valid_config();
        config.tokens.refresh_token_lifetime_days = u32::MAX;
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("refresh_token_lifetime_days")
        );

        let mut config = valid_config();
        config.tokens.access_token_lifetime_minutes = MAX_ACCESS_TOKEN_LIFETIME_MINUTES;
        config.tokens.refresh_token_lifetime_days = MAX_REFRESH_TOKEN_LIFETIME_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lifetime_conversions() {
        let lifetimes = TokenLifetimes {
            access_token_lifetime_minutes: 30,
            refresh_token_lifetime_days: 2,
        };
        assert_eq!(lifetimes.access_token_lifetime(), time::Duration::minutes(30));
        assert_eq!(lifetimes.refresh_token_lifetime(), time::Duration::hours(48));
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = valid_config();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: AuthConfig = serde_json::from_value(serde_json::json!({
            "signing": {
                "secret": "0123456789abcdef0123456789abcdef",
                "issuer": "duelgate",
                "audience": "duelgate-web"
            },
            "tokens": { "access_token_lifetime_minutes": 5 },
            "operation_timeout": "3s"
        }))
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.tokens.access_token_lifetime_minutes, 5);
        assert_eq!(config.tokens.refresh_token_lifetime_days, 7);
        assert_eq!(config.operation_timeout, Duration::from_secs(3));
    }
}
