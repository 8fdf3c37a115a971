//! [`RefreshTokenStore`] implementation over a shared pool.

use std::sync::Arc;

use async_trait::async_trait;
use duelgate_auth::{AuthResult, RefreshToken, RefreshTokenStore, RefreshTokenTransaction};

use crate::token::TokenStorage;
use crate::transaction::PostgresRefreshTokenTransaction;
use crate::{PgPool, StorageError};

/// Arc-owning PostgreSQL refresh token store.
///
/// Owns an `Arc<PgPool>` instead of borrowing, so it can be handed to the
/// coordinators as `Arc<dyn RefreshTokenStore>`.
#[derive(Debug, Clone)]
pub struct PostgresRefreshTokenStore {
    pool: Arc<PgPool>,
}

impl PostgresRefreshTokenStore {
    /// Create a new store.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PostgresRefreshTokenStore {
    async fn begin(&self) -> AuthResult<Box<dyn RefreshTokenTransaction>> {
        let tx = self.pool.begin().await.map_err(StorageError::from)?;
        Ok(Box::new(PostgresRefreshTokenTransaction::new(tx)))
    }

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        let row = TokenStorage::new(&self.pool).find_by_token(token).await?;
        Ok(row.map(RefreshToken::from))
    }

    async fn find_active_by_account(&self, account_id: &str) -> AuthResult<Option<RefreshToken>> {
        let row = TokenStorage::new(&self.pool)
            .find_active_by_account(account_id)
            .await?;
        Ok(row.map(RefreshToken::from))
    }

    async fn list_by_account(&self, account_id: &str) -> AuthResult<Vec<RefreshToken>> {
        let rows = TokenStorage::new(&self.pool)
            .list_by_account(account_id)
            .await?;
        Ok(rows.into_iter().map(RefreshToken::from).collect())
    }
}
