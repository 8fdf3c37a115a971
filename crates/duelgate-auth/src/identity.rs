//! Account lookup collaborator.
//!
//! Credential verification lives outside this crate. During refresh the
//! coordinator only knows the account id stored on the refresh token, so it
//! asks an [`AccountDirectory`] for the current email and roles before
//! minting the new access token.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::AuthResult;
use crate::types::AccountIdentity;

/// Looks up verified accounts by id.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Returns the account's current identity, or `None` if it no longer exists.
    async fn find_account(&self, account_id: &str) -> AuthResult<Option<AccountIdentity>>;
}

/// Fixed set of accounts held in memory.
///
/// Useful for tests and for operator tooling that supplies roles explicitly.
#[derive(Debug, Default)]
pub struct StaticAccountDirectory {
    accounts: RwLock<HashMap<String, AccountIdentity>>,
}

impl StaticAccountDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory pre-populated with `accounts`.
    #[must_use]
    pub fn with_accounts(accounts: impl IntoIterator<Item = AccountIdentity>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|a| (a.account_id.clone(), a))
            .collect();
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    /// Adds or replaces an account.
    pub async fn insert(&self, identity: AccountIdentity) {
        self.accounts
            .write()
            .await
            .insert(identity.account_id.clone(), identity);
    }

    /// Removes an account.
    pub async fn remove(&self, account_id: &str) -> Option<AccountIdentity> {
        self.accounts.write().await.remove(account_id)
    }
}

#[async_trait]
impl AccountDirectory for StaticAccountDirectory {
    async fn find_account(&self, account_id: &str) -> AuthResult<Option<AccountIdentity>> {
        Ok(self.accounts.read().await.get(account_id).cloned())
    }
}
