//! Explicit refresh token revocation.
//!
//! Used for logout and for operators signing an account out. Revocation is
//! terminal and leaves `replaced_by_token` empty, which is how a manual
//! revocation is told apart from a rotation afterwards.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::RefreshTokenStore;
use crate::token::rotation::ensure_active;
use crate::types::RefreshToken;
use crate::validation;

/// Revokes refresh tokens.
#[derive(Clone)]
pub struct RevocationEnforcer {
    store: Arc<dyn RefreshTokenStore>,
}

impl RevocationEnforcer {
    /// Creates an enforcer over `store`.
    pub fn new(store: Arc<dyn RefreshTokenStore>) -> Self {
        Self { store }
    }

    /// Revokes `token` on behalf of `ip` and returns the updated record.
    ///
    /// Revoking an already revoked or expired token fails, so callers can
    /// tell a real logout from a replayed one.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed token or ip
    /// - `InvalidToken` if the token is unknown or no longer active
    pub async fn revoke(&self, token: &str, ip: &str) -> AuthResult<RefreshToken> {
        let token = validation::refresh_token_format(token)?;
        let ip = validation::normalize_ip(ip)?;
        let now = OffsetDateTime::now_utc();

        let mut tx = self.store.begin().await?;
        let mut current = tx
            .find_by_token(token)
            .await?
            .ok_or_else(|| AuthError::invalid_token("Refresh token not found"))?;
        ensure_active(&current, now)?;

        current.revoke(now, ip, None);
        tx.update(&current).await?;
        tx.commit().await?;

        tracing::info!(account_id = %current.account_id, "Refresh token revoked");
        Ok(current)
    }

    /// Revokes the account's active refresh token, if it has one.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty account id or malformed ip.
    pub async fn revoke_for_account(
        &self,
        account_id: &str,
        ip: &str,
    ) -> AuthResult<Option<RefreshToken>> {
        let account_id = validation::require_non_empty("account_id", account_id)?;
        let ip = validation::normalize_ip(ip)?;
        let now = OffsetDateTime::now_utc();

        let mut tx = self.store.begin().await?;
        let Some(mut current) = tx.find_unrevoked_by_account(account_id).await? else {
            return Ok(None);
        };
        if !current.is_active_at(now) {
            return Ok(None);
        }

        current.revoke(now, ip, None);
        tx.update(&current).await?;
        tx.commit().await?;

        tracing::info!(account_id = %account_id, "Account session revoked");
        Ok(Some(current))
    }
}
