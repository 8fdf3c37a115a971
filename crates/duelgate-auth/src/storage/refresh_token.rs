//! Refresh token storage contract.
//!
//! Reads that only inform a decision go through [`RefreshTokenStore`]
//! directly. Anything that mutates goes through a [`RefreshTokenTransaction`]
//! so that revoke-then-create either lands completely or not at all.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::RefreshToken;

/// Storage trait for refresh tokens.
///
/// Backends must enforce two constraints at write time, reporting violations
/// as [`AuthError::Conflict`](crate::AuthError::Conflict):
///
/// 1. `token` is unique.
/// 2. At most one row per `account_id` has `revoked_at` unset. Expired rows
///    still occupy this slot until they are revoked or deleted.
///
/// The second constraint is what keeps concurrent logins and rotations for
/// the same account from leaving two live sessions behind.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Opens a transaction. Dropping it without calling
    /// [`commit`](RefreshTokenTransaction::commit) discards its writes.
    async fn begin(&self) -> AuthResult<Box<dyn RefreshTokenTransaction>>;

    /// Finds a token record by value.
    async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>>;

    /// Finds the account's active (unrevoked, unexpired) token.
    async fn find_active_by_account(&self, account_id: &str) -> AuthResult<Option<RefreshToken>>;

    /// Lists every token ever issued to the account, newest first.
    async fn list_by_account(&self, account_id: &str) -> AuthResult<Vec<RefreshToken>>;
}

/// A unit of work against a [`RefreshTokenStore`].
#[async_trait]
pub trait RefreshTokenTransaction: Send {
    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// `Conflict` if the token value exists or the account already has an
    /// unrevoked row.
    async fn create(&mut self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds a token record by value, seeing this transaction's own writes.
    async fn find_by_token(&mut self, token: &str) -> AuthResult<Option<RefreshToken>>;

    /// Finds the row holding the account's single unrevoked slot, expired or not.
    async fn find_unrevoked_by_account(
        &mut self,
        account_id: &str,
    ) -> AuthResult<Option<RefreshToken>>;

    /// Persists the revocation fields of an existing record.
    ///
    /// Only `revoked_at`, `revoked_by_ip` and `replaced_by_token` are written.
    async fn update(&mut self, token: &RefreshToken) -> AuthResult<()>;

    /// Physically removes a record.
    async fn delete(&mut self, token: &str) -> AuthResult<()>;

    /// Makes every write in this transaction visible atomically.
    async fn commit(self: Box<Self>) -> AuthResult<()>;

    /// Discards every write in this transaction.
    async fn rollback(self: Box<Self>) -> AuthResult<()>;
}
