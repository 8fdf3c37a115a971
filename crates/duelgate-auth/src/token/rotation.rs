//! Refresh token creation and rotation.
//!
//! Every account has at most one active refresh token. Logging in replaces
//! whatever session the account had; refreshing exchanges the presented
//! token for a successor and records the link between them. Both paths run
//! inside a single storage transaction, so observers never see two active
//! tokens or a revoked token without its successor.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::RefreshTokenStore;
use crate::types::RefreshToken;
use crate::validation;

/// Creates and rotates refresh tokens.
#[derive(Clone)]
pub struct RotationCoordinator {
    store: Arc<dyn RefreshTokenStore>,
    lifetime: Duration,
}

impl RotationCoordinator {
    /// Creates a coordinator issuing tokens valid for `lifetime`.
    pub fn new(store: Arc<dyn RefreshTokenStore>, lifetime: Duration) -> Self {
        Self { store, lifetime }
    }

    /// Refresh token lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a new refresh token for `account_id`, replacing the account's
    /// current one.
    ///
    /// An active predecessor is revoked by `ip`; an expired one still holding
    /// the account's slot is deleted.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty account id or malformed ip
    /// - `Conflict` if a concurrent writer claimed the account's slot first
    /// - `Storage` if the backend fails
    pub async fn create_for_account(&self, account_id: &str, ip: &str) -> AuthResult<RefreshToken> {
        let account_id = validation::require_non_empty("account_id", account_id)?;
        let ip = validation::normalize_ip(ip)?;
        let now = OffsetDateTime::now_utc();

        let mut tx = self.store.begin().await?;

        if let Some(mut current) = tx.find_unrevoked_by_account(account_id).await? {
            if current.is_active_at(now) {
                current.revoke(now, ip.as_str(), None);
                tx.update(&current).await?;
                tracing::debug!(account_id = %account_id, "Revoked previous session");
            } else {
                tx.delete(&current.token).await?;
                tracing::debug!(account_id = %account_id, "Deleted stale refresh token");
            }
        }

        let token = RefreshToken::issue(account_id, ip, now, self.lifetime)?;
        tx.create(&token).await?;
        tx.commit().await?;

        Ok(token)
    }

    /// Exchanges `old_token` for a successor bound to the same account.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed token or ip
    /// - `InvalidToken` if the token is unknown, expired, revoked or already rotated
    /// - `IpMismatch` if `ip` is not the address the token was created from;
    ///   nothing is written in that case
    /// - `Conflict` if a concurrent writer claimed the account's slot first
    pub async fn rotate(&self, old_token: &str, ip: &str) -> AuthResult<RefreshToken> {
        let old_token = validation::refresh_token_format(old_token)?;
        let ip = validation::normalize_ip(ip)?;
        let now = OffsetDateTime::now_utc();

        let mut tx = self.store.begin().await?;

        let mut current = tx
            .find_by_token(old_token)
            .await?
            .ok_or_else(|| AuthError::invalid_token("Refresh token not found"))?;

        ensure_active(&current, now)?;

        if current.created_by_ip != ip {
            tracing::warn!(
                account_id = %current.account_id,
                created_by_ip = %current.created_by_ip,
                ip = %ip,
                "Refresh token presented from a different address"
            );
            return Err(AuthError::IpMismatch);
        }

        let successor =
            RefreshToken::issue(current.account_id.as_str(), ip.as_str(), now, self.lifetime)?;
        current.revoke(now, ip, Some(successor.token.clone()));

        tx.update(&current).await?;
        tx.create(&successor).await?;
        tx.commit().await?;

        tracing::debug!(account_id = %successor.account_id, "Rotated refresh token");
        Ok(successor)
    }
}

/// Rejects revoked and expired tokens with a reason.
pub(crate) fn ensure_active(token: &RefreshToken, now: OffsetDateTime) -> AuthResult<()> {
    if token.is_revoked() {
        return Err(AuthError::invalid_token("Refresh token has been revoked"));
    }
    if token.is_expired_at(now) {
        return Err(AuthError::invalid_token("Refresh token has expired"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::InMemoryRefreshTokenStore;

    fn coordinator() -> (InMemoryRefreshTokenStore, RotationCoordinator) {
        let store = InMemoryRefreshTokenStore::new();
        let rotation = RotationCoordinator::new(Arc::new(store.clone()), Duration::days(7));
        (store, rotation)
    }

    #[tokio::test]
    async fn test_create_for_new_account() {
        let (store, rotation) = coordinator();
        let token = rotation.create_for_account("acc-1", "1.1.1.1").await.unwrap();

        assert_eq!(token.token.len(), 88);
        assert_eq!(token.created_by_ip, "1.1.1.1");
        assert_eq!(token.expires_at - token.created_at, Duration::days(7));
        assert_eq!(store.find_by_token(&token.token).await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn test_create_revokes_previous() {
        let (store, rotation) = coordinator();
        let first = rotation.create_for_account("acc-1", "1.1.1.1").await.unwrap();
        let second = rotation.create_for_account("acc-1", "2.2.2.2").await.unwrap();

        let first = store.find_by_token(&first.token).await.unwrap().unwrap();
        assert!(first.is_revoked());
        assert_eq!(first.revoked_by_ip.as_deref(), Some("2.2.2.2"));
        assert!(first.replaced_by_token.is_none());

        let active = store.find_active_by_account("acc-1").await.unwrap().unwrap();
        assert_eq!(active.token, second.token);
    }

    #[tokio::test]
    async fn test_rotate() {
        let (store, rotation) = coordinator();
        let t1 = rotation.create_for_account("acc-1", "1.1.1.1").await.unwrap();
        let t2 = rotation.rotate(&t1.token, "1.1.1.1").await.unwrap();

        assert_ne!(t1.token, t2.token);
        assert_eq!(t2.account_id, "acc-1");
        assert!(t2.is_active());

        let t1 = store.find_by_token(&t1.token).await.unwrap().unwrap();
        assert!(t1.is_revoked());
        assert_eq!(t1.replaced_by_token.as_deref(), Some(t2.token.as_str()));
    }

    #[tokio::test]
    async fn test_rotate_twice_fails() {
        let (_, rotation) = coordinator();
        let t1 = rotation.create_for_account("acc-1", "1.1.1.1").await.unwrap();
        rotation.rotate(&t1.token, "1.1.1.1").await.unwrap();

        let err = rotation.rotate(&t1.token, "1.1.1.1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
    }

    #[tokio::test]
    async fn test_rotate_ip_mismatch_leaves_token_untouched() {
        let (store, rotation) = coordinator();
        let t1 = rotation.create_for_account("acc-1", "1.1.1.1").await.unwrap();

        let err = rotation.rotate(&t1.token, "9.9.9.9").await.unwrap_err();
        assert!(matches!(err, AuthError::IpMismatch));

        let stored = store.find_by_token(&t1.token).await.unwrap().unwrap();
        assert_eq!(stored, t1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_rotate_unknown_token() {
        let (_, rotation) = coordinator();
        let err = rotation
            .rotate(&RefreshToken::generate_token(), "1.1.1.1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
    }

    #[tokio::test]
    async fn test_rotate_rejects_bad_arguments() {
        let (_, rotation) = coordinator();
        let t1 = rotation.create_for_account("acc-1", "1.1.1.1").await.unwrap();

        assert_eq!(
            rotation.rotate("", "1.1.1.1").await.unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            rotation.rotate(&t1.token, "").await.unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            rotation.create_for_account(" ", "1.1.1.1").await.unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[tokio::test]
    async fn test_ipv6_forms_compare_equal() {
        let (_, rotation) = coordinator();
        let t1 = rotation.create_for_account("acc-1", "::1").await.unwrap();
        assert!(rotation.rotate(&t1.token, "0:0:0:0:0:0:0:1").await.is_ok());
    }
}
