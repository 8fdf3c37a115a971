//! PostgreSQL refresh token transaction.
//!
//! Wraps an sqlx transaction. Rows read through it are locked with
//! `FOR UPDATE`, so two rotations of the same token serialize: the second
//! one sees the first one's revocation and fails with `InvalidToken`. Two
//! logins racing for an account with no row to lock are separated by the
//! filtered unique index instead, and the loser gets `Conflict`.

use async_trait::async_trait;
use duelgate_auth::{AuthResult, RefreshToken, RefreshTokenTransaction};
use sqlx_postgres::PgTransaction;

use crate::StorageError;
use crate::token;

/// PostgreSQL implementation of [`RefreshTokenTransaction`].
///
/// Rolls back on drop unless committed.
pub struct PostgresRefreshTokenTransaction {
    /// `None` once committed or rolled back.
    tx: Option<PgTransaction<'static>>,
}

impl PostgresRefreshTokenTransaction {
    /// Wraps an open sqlx transaction.
    #[must_use]
    pub fn new(tx: PgTransaction<'static>) -> Self {
        Self { tx: Some(tx) }
    }

    fn open(&mut self) -> Result<&mut PgTransaction<'static>, StorageError> {
        self.tx.as_mut().ok_or_else(|| {
            StorageError::transaction("Transaction already completed (committed or rolled back)")
        })
    }
}

#[async_trait]
impl RefreshTokenTransaction for PostgresRefreshTokenTransaction {
    async fn create(&mut self, refresh_token: &RefreshToken) -> AuthResult<()> {
        token::insert(self.open()?, refresh_token).await?;
        Ok(())
    }

    async fn find_by_token(&mut self, value: &str) -> AuthResult<Option<RefreshToken>> {
        let row = token::find_by_token_for_update(self.open()?, value).await?;
        Ok(row.map(RefreshToken::from))
    }

    async fn find_unrevoked_by_account(
        &mut self,
        account_id: &str,
    ) -> AuthResult<Option<RefreshToken>> {
        let row = token::find_unrevoked_by_account_for_update(self.open()?, account_id).await?;
        Ok(row.map(RefreshToken::from))
    }

    async fn update(&mut self, refresh_token: &RefreshToken) -> AuthResult<()> {
        token::update_revocation(self.open()?, refresh_token).await?;
        Ok(())
    }

    async fn delete(&mut self, value: &str) -> AuthResult<()> {
        token::delete(self.open()?, value).await?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> AuthResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit()
                .await
                .map_err(|e| StorageError::from_write(e, "refresh token commit"))?;
            tracing::debug!("Refresh token transaction committed");
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> AuthResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(StorageError::from)?;
            tracing::debug!("Refresh token transaction rolled back");
        }
        Ok(())
    }
}

impl Drop for PostgresRefreshTokenTransaction {
    /// sqlx issues the ROLLBACK itself when the inner transaction drops.
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::debug!("Refresh token transaction dropped without commit, rolling back");
        }
    }
}
