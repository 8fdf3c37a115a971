//! Authentication error types.
//!
//! Every operation in this crate fails with an [`AuthError`]. Variants carry
//! enough detail for logs; [`AuthError::kind`] collapses them into the five
//! kinds callers are expected to branch on.

use std::fmt;

use crate::config::ConfigError;

/// Errors that can occur while issuing, rotating or revoking credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required argument was empty or malformed.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the offending argument.
        message: String,
    },

    /// The refresh token is unknown, expired, revoked or already rotated.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token was rejected.
        message: String,
    },

    /// Rotation was requested from an address other than the one that
    /// created the token.
    #[error("Refresh token was issued to a different address")]
    IpMismatch,

    /// A storage uniqueness constraint rejected the write.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the violated constraint.
        message: String,
    },

    /// The storage backend failed or is unavailable.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// The operation did not finish within the configured deadline.
    #[error("Operation timed out: {operation}")]
    Timeout {
        /// Name of the operation that timed out.
        operation: String,
    },

    /// An unexpected internal error occurred (signing failures included).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the kind callers branch on.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::InvalidToken { .. } => ErrorKind::InvalidToken,
            Self::IpMismatch => ErrorKind::IpMismatch,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Timeout { .. }
            | Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns `true` if the caller supplied something unacceptable (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if the failure is on our side (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    /// Suggested HTTP status for transport layers.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::InvalidToken | ErrorKind::IpMismatch => 401,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

/// The five error kinds exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or malformed argument.
    InvalidInput,
    /// Token absent, expired, revoked or rotated.
    InvalidToken,
    /// Rotation attempted from another address.
    IpMismatch,
    /// Uniqueness violation in storage.
    Conflict,
    /// Signing, configuration, storage or deadline failure.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::InvalidToken => write!(f, "invalid_token"),
            Self::IpMismatch => write!(f, "ip_mismatch"),
            Self::Conflict => write!(f, "conflict"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
