//! Verified account identity.

use serde::{Deserialize, Serialize};

/// An account whose credentials were already verified elsewhere.
///
/// Roles are opaque strings; this crate copies them into access tokens and
/// never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentity {
    /// Account identifier, used as the `sub` claim.
    pub account_id: String,

    /// Email address, emitted as the `email` claim when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role names, one `roles` claim entry each.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AccountIdentity {
    /// Creates an identity with no email and no roles.
    #[must_use]
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            email: None,
            roles: Vec::new(),
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Replaces the role set.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}
