//! In-memory refresh token store.
//!
//! Transactions collect their writes and apply them on commit against a copy
//! of the committed rows; the copy replaces the rows only if every write
//! passes the same uniqueness checks a database would apply. A revocation
//! whose row was revoked by another transaction after it was read fails with
//! `Conflict`, so only one of two racing revokes or rotations commits. The
//! PostgreSQL backend gets the same outcome from row locks, surfacing the
//! loser as `InvalidToken` instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::{RefreshTokenStore, RefreshTokenTransaction};
use crate::types::RefreshToken;

type Rows = HashMap<String, RefreshToken>;

/// Process-local [`RefreshTokenStore`].
///
/// Cloning shares the underlying rows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRefreshTokenStore {
    rows: Arc<RwLock<Rows>>,
}

impl InMemoryRefreshTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, revoked ones included.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns `true` if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn begin(&self) -> AuthResult<Box<dyn RefreshTokenTransaction>> {
        Ok(Box::new(InMemoryRefreshTokenTransaction {
            rows: Arc::clone(&self.rows),
            operations: Vec::new(),
        }))
    }

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.rows.read().await.get(token).cloned())
    }

    async fn find_active_by_account(&self, account_id: &str) -> AuthResult<Option<RefreshToken>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|t| t.account_id == account_id && t.is_active_at(now))
            .cloned())
    }

    async fn list_by_account(&self, account_id: &str) -> AuthResult<Vec<RefreshToken>> {
        let mut tokens: Vec<RefreshToken> = self
            .rows
            .read()
            .await
            .values()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }
}

/// Pending write inside an in-memory transaction.
#[derive(Debug)]
enum TransactionOp {
    Create(RefreshToken),
    Update(RefreshToken),
    Delete(String),
}

/// Transaction over an [`InMemoryRefreshTokenStore`].
///
/// Writes are checked against the transaction's own view when staged and
/// again against the latest committed rows on commit.
pub struct InMemoryRefreshTokenTransaction {
    rows: Arc<RwLock<Rows>>,
    operations: Vec<TransactionOp>,
}

impl InMemoryRefreshTokenTransaction {
    /// Committed rows with this transaction's writes applied.
    async fn view(&self) -> AuthResult<Rows> {
        let mut rows = self.rows.read().await.clone();
        for op in &self.operations {
            apply(&mut rows, op)?;
        }
        Ok(rows)
    }

    async fn stage(&mut self, op: TransactionOp) -> AuthResult<()> {
        let mut view = self.view().await?;
        apply(&mut view, &op)?;
        self.operations.push(op);
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenTransaction for InMemoryRefreshTokenTransaction {
    async fn create(&mut self, token: &RefreshToken) -> AuthResult<()> {
        self.stage(TransactionOp::Create(token.clone())).await
    }

    async fn find_by_token(&mut self, token: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.view().await?.remove(token))
    }

    async fn find_unrevoked_by_account(
        &mut self,
        account_id: &str,
    ) -> AuthResult<Option<RefreshToken>> {
        Ok(self
            .view()
            .await?
            .into_values()
            .find(|t| t.account_id == account_id && !t.is_revoked()))
    }

    async fn update(&mut self, token: &RefreshToken) -> AuthResult<()> {
        self.stage(TransactionOp::Update(token.clone())).await
    }

    async fn delete(&mut self, token: &str) -> AuthResult<()> {
        self.stage(TransactionOp::Delete(token.to_string())).await
    }

    async fn commit(self: Box<Self>) -> AuthResult<()> {
        let mut rows = self.rows.write().await;
        let mut next = rows.clone();
        for op in &self.operations {
            apply(&mut next, op)?;
        }
        *rows = next;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AuthResult<()> {
        Ok(())
    }
}

fn apply(rows: &mut Rows, op: &TransactionOp) -> AuthResult<()> {
    match op {
        TransactionOp::Create(token) => {
            if rows.contains_key(&token.token) {
                return Err(AuthError::conflict("refresh token value already exists"));
            }
            if !token.is_revoked() && holds_unrevoked_slot(rows, token) {
                return Err(AuthError::conflict(
                    "account already holds an unrevoked refresh token",
                ));
            }
            rows.insert(token.token.clone(), token.clone());
        }
        TransactionOp::Update(token) => {
            if !token.is_revoked() && holds_unrevoked_slot(rows, token) {
                return Err(AuthError::conflict(
                    "account already holds an unrevoked refresh token",
                ));
            }
            let existing = rows
                .get_mut(&token.token)
                .ok_or_else(|| AuthError::storage("refresh token not found for update"))?;
            // Revocation is terminal: a write based on a stale read loses.
            if existing.is_revoked() {
                return Err(AuthError::conflict("refresh token was already revoked"));
            }
            existing.revoked_at = token.revoked_at;
            existing.revoked_by_ip = token.revoked_by_ip.clone();
            existing.replaced_by_token = token.replaced_by_token.clone();
        }
        TransactionOp::Delete(token) => {
            rows.remove(token);
        }
    }
    Ok(())
}

/// Whether another row of the same account is still unrevoked.
fn holds_unrevoked_slot(rows: &Rows, token: &RefreshToken) -> bool {
    rows.values().any(|other| {
        other.token != token.token && other.account_id == token.account_id && !other.is_revoked()
    })
}
