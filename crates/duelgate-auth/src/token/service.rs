//! Authentication coordinator.
//!
//! Top-level entry point pairing access tokens with refresh tokens:
//!
//! - Login: verified identity in, fresh token pair out
//! - Refresh: rotate the presented refresh token and mint a new access token
//! - Logout: revoke the presented refresh token
//!
//! # Usage
//!
//! ```ignore
//! use duelgate_auth::AuthenticationCoordinator;
//!
//! let auth = AuthenticationCoordinator::new(&config, store, directory)?;
//!
//! let pair = auth.authenticate(&identity, "203.0.113.7").await?;
//! let pair = auth.refresh(&pair.refresh_token, "203.0.113.7").await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::identity::AccountDirectory;
use crate::storage::RefreshTokenStore;
use crate::token::jwt::AccessTokenIssuer;
use crate::token::revocation::RevocationEnforcer;
use crate::token::rotation::{RotationCoordinator, ensure_active};
use crate::types::{AccountIdentity, RefreshToken, TokenPair};
use crate::validation;

/// Issues and refreshes token pairs.
///
/// Access tokens are always minted before anything is committed, so a
/// failure at any step leaves storage exactly as it was.
pub struct AuthenticationCoordinator {
    issuer: Arc<AccessTokenIssuer>,
    rotation: RotationCoordinator,
    revocation: RevocationEnforcer,
    store: Arc<dyn RefreshTokenStore>,
    directory: Arc<dyn AccountDirectory>,
    operation_timeout: Option<std::time::Duration>,
}

impl AuthenticationCoordinator {
    /// Builds a coordinator from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn RefreshTokenStore>,
        directory: Arc<dyn AccountDirectory>,
    ) -> AuthResult<Self> {
        config.validate()?;
        let issuer = Arc::new(AccessTokenIssuer::from_config(config)?);

        Ok(Self {
            issuer,
            rotation: RotationCoordinator::new(
                Arc::clone(&store),
                config.tokens.refresh_token_lifetime(),
            ),
            revocation: RevocationEnforcer::new(Arc::clone(&store)),
            store,
            directory,
            operation_timeout: Some(config.operation_timeout),
        })
    }

    /// Overrides the per-operation deadline. `None` disables it.
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Logs a verified account in from `ip`.
    ///
    /// Any session the account already had is revoked.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for bad arguments, `Conflict` if a concurrent login for
    /// the same account won, `Internal` for signing, storage or deadline
    /// failures.
    pub async fn authenticate(&self, identity: &AccountIdentity, ip: &str) -> AuthResult<TokenPair> {
        self.within_deadline("authenticate", async {
            let now = OffsetDateTime::now_utc();
            let access = self.issuer.issue(identity, now)?;
            let refresh = self
                .rotation
                .create_for_account(&identity.account_id, ip)
                .await?;

            tracing::info!(
                account_id = %refresh.account_id,
                ip = %refresh.created_by_ip,
                "Account authenticated"
            );
            Ok(pair(access.token, access.expires_at, &refresh))
        })
        .await
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// Roles and email for the new access token are looked up fresh, so role
    /// changes take effect on the next refresh.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed token or ip
    /// - `InvalidToken` if the token is not active or its account is gone
    /// - `IpMismatch` if `ip` differs from the token's creating address
    /// - `Conflict` if a concurrent rotation won
    pub async fn refresh(&self, old_token: &str, ip: &str) -> AuthResult<TokenPair> {
        self.within_deadline("refresh", async {
            let old_token = validation::refresh_token_format(old_token)?;
            let now = OffsetDateTime::now_utc();

            let current = self
                .store
                .find_by_token(old_token)
                .await?
                .ok_or_else(|| AuthError::invalid_token("Refresh token not found"))?;
            ensure_active(&current, now)?;

            let identity = self
                .directory
                .find_account(&current.account_id)
                .await?
                .ok_or_else(|| {
                    tracing::warn!(account_id = %current.account_id, "Refresh for unknown account");
                    AuthError::invalid_token("Account no longer exists")
                })?;

            let access = self.issuer.issue(&identity, now)?;
            let refresh = self.rotation.rotate(old_token, ip).await?;

            tracing::info!(account_id = %refresh.account_id, "Session refreshed");
            Ok(pair(access.token, access.expires_at, &refresh))
        })
        .await
    }

    /// Revokes the presented refresh token.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for bad arguments, `InvalidToken` if the token is not
    /// active.
    pub async fn logout(&self, token: &str, ip: &str) -> AuthResult<()> {
        self.within_deadline("logout", async {
            self.revocation.revoke(token, ip).await.map(|_| ())
        })
        .await
    }

    /// Returns the stored record for `token`, whatever its state.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed token.
    pub async fn inspect(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        self.within_deadline("inspect", async {
            let token = validation::refresh_token_format(token)?;
            self.store.find_by_token(token).await
        })
        .await
    }

    /// The access token issuer.
    #[must_use]
    pub fn issuer(&self) -> &Arc<AccessTokenIssuer> {
        &self.issuer
    }

    /// The refresh token rotation coordinator.
    #[must_use]
    pub fn rotation(&self) -> &RotationCoordinator {
        &self.rotation
    }

    /// The revocation enforcer.
    #[must_use]
    pub fn revocation(&self) -> &RevocationEnforcer {
        &self.revocation
    }

    /// Runs `fut` under the configured deadline. A timed-out future is
    /// dropped, which rolls back any open transaction.
    async fn within_deadline<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = AuthResult<T>>,
    ) -> AuthResult<T> {
        match self.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                tracing::warn!(operation, timeout = ?limit, "Operation timed out");
                AuthError::timeout(operation)
            })?,
            None => fut.await,
        }
    }
}

fn pair(access_token: String, access_expires_at: OffsetDateTime, refresh: &RefreshToken) -> TokenPair {
    TokenPair {
        access_token,
        access_token_expires_at: access_expires_at,
        refresh_token: refresh.token.clone(),
        refresh_token_expires_at: refresh.expires_at,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::config::{SigningConfig, SigningSecret};
    use crate::error::ErrorKind;
    use crate::identity::StaticAccountDirectory;
    use crate::storage::{InMemoryRefreshTokenStore, RefreshTokenTransaction};

    fn config() -> AuthConfig {
        AuthConfig {
            signing: SigningConfig {
                secret: SigningSecret::new("an-hs256-secret-of-at-least-32-bytes!"),
                issuer: "duelgate".to_string(),
                audience: "duelgate-web".to_string(),
            },
            ..AuthConfig::default()
        }
    }

    fn player() -> AccountIdentity {
        AccountIdentity::new("acc-1").with_roles(["Player"])
    }

    fn setup() -> (
        InMemoryRefreshTokenStore,
        Arc<StaticAccountDirectory>,
        AuthenticationCoordinator,
    ) {
        let store = InMemoryRefreshTokenStore::new();
        let directory = Arc::new(StaticAccountDirectory::with_accounts([player()]));
        let auth =
            AuthenticationCoordinator::new(&config(), Arc::new(store.clone()), directory.clone())
                .unwrap();
        (store, directory, auth)
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let store: Arc<dyn RefreshTokenStore> = Arc::new(InMemoryRefreshTokenStore::new());
        let directory: Arc<dyn AccountDirectory> = Arc::new(StaticAccountDirectory::new());

        let result = AuthenticationCoordinator::new(&AuthConfig::default(), store, directory);
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (store, _, auth) = setup();
        let pair = auth.authenticate(&player(), "1.1.1.1").await.unwrap();

        let claims = auth.issuer().verify(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "acc-1");
        assert_eq!(claims.roles, vec!["Player"]);

        let stored = store.find_by_token(&pair.refresh_token).await.unwrap().unwrap();
        assert_eq!(stored.account_id, "acc-1");
        assert_eq!(pair.refresh_token_expires_at, stored.expires_at);
    }

    #[tokio::test]
    async fn test_refresh_uses_current_roles() {
        let (_, directory, auth) = setup();
        let first = auth.authenticate(&player(), "1.1.1.1").await.unwrap();

        directory
            .insert(AccountIdentity::new("acc-1").with_roles(["Player", "Judge"]))
            .await;
        let second = auth.refresh(&first.refresh_token, "1.1.1.1").await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        let claims = auth.issuer().verify(&second.access_token).unwrap();
        assert_eq!(claims.roles, vec!["Player", "Judge"]);
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_account() {
        let (store, directory, auth) = setup();
        let pair = auth.authenticate(&player(), "1.1.1.1").await.unwrap();
        directory.remove("acc-1").await;

        let err = auth.refresh(&pair.refresh_token, "1.1.1.1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);

        // nothing was rotated
        let stored = store.find_by_token(&pair.refresh_token).await.unwrap().unwrap();
        assert!(stored.is_active());
    }

    #[tokio::test]
    async fn test_refresh_ip_mismatch() {
        let (store, _, auth) = setup();
        let pair = auth.authenticate(&player(), "1.1.1.1").await.unwrap();

        let err = auth.refresh(&pair.refresh_token, "9.9.9.9").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IpMismatch);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_logout_and_inspect() {
        let (_, _, auth) = setup();
        let pair = auth.authenticate(&player(), "1.1.1.1").await.unwrap();

        auth.logout(&pair.refresh_token, "1.1.1.1").await.unwrap();
        let record = auth.inspect(&pair.refresh_token).await.unwrap().unwrap();
        assert!(record.is_revoked());

        let err = auth.refresh(&pair.refresh_token, "1.1.1.1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert!(
            auth.inspect(&RefreshToken::generate_token())
                .await
                .unwrap()
                .is_none()
        );
    }

    /// Store whose transactions never open in time.
    struct StalledStore;

    #[async_trait]
    impl RefreshTokenStore for StalledStore {
        async fn begin(&self) -> AuthResult<Box<dyn RefreshTokenTransaction>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(AuthError::storage("unreachable"))
        }

        async fn find_by_token(&self, _token: &str) -> AuthResult<Option<RefreshToken>> {
            Ok(None)
        }

        async fn find_active_by_account(&self, _account_id: &str) -> AuthResult<Option<RefreshToken>> {
            Ok(None)
        }

        async fn list_by_account(&self, _account_id: &str) -> AuthResult<Vec<RefreshToken>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_operation_timeout() {
        let auth = AuthenticationCoordinator::new(
            &config(),
            Arc::new(StalledStore),
            Arc::new(StaticAccountDirectory::new()),
        )
        .unwrap()
        .with_operation_timeout(Some(Duration::from_millis(20)));

        let err = auth.authenticate(&player(), "1.1.1.1").await.unwrap_err();
        assert!(matches!(err, AuthError::Timeout { .. }));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
