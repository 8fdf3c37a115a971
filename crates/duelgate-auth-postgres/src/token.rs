//! Refresh token queries.
//!
//! Pool-level reads live on [`TokenStorage`]. Writes and the reads that
//! precede them take a transaction so the row locks and the filtered unique
//! index cover the whole revoke-then-create sequence.

use duelgate_auth::RefreshToken;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgTransaction;
use time::OffsetDateTime;

use crate::{PgPool, StorageError, StorageResult};

const COLUMNS: &str = "token, account_id, created_at, expires_at, created_by_ip, \
                       revoked_at, revoked_by_ip, replaced_by_token";

/// Revocation is terminal: only an unrevoked row may be updated.
const REVOKE_SQL: &str = r#"
    UPDATE refresh_tokens
    SET revoked_at = $2, revoked_by_ip = $3, replaced_by_token = $4
    WHERE token = $1 AND revoked_at IS NULL
"#;

// =============================================================================
// Types
// =============================================================================

type RowTuple = (
    String,
    String,
    OffsetDateTime,
    OffsetDateTime,
    String,
    Option<OffsetDateTime>,
    Option<String>,
    Option<String>,
);

/// Refresh token row as stored in `refresh_tokens`.
#[derive(Debug, Clone)]
pub struct TokenRow {
    /// Token value (primary key).
    pub token: String,
    /// Owning account.
    pub account_id: String,
    /// Creation time.
    pub created_at: OffsetDateTime,
    /// Expiry time.
    pub expires_at: OffsetDateTime,
    /// Creating address.
    pub created_by_ip: String,
    /// Revocation time.
    pub revoked_at: Option<OffsetDateTime>,
    /// Revoking address.
    pub revoked_by_ip: Option<String>,
    /// Successor token.
    pub replaced_by_token: Option<String>,
}

impl TokenRow {
    fn from_tuple(row: RowTuple) -> Self {
        Self {
            token: row.0,
            account_id: row.1,
            created_at: row.2,
            expires_at: row.3,
            created_by_ip: row.4,
            revoked_at: row.5,
            revoked_by_ip: row.6,
            replaced_by_token: row.7,
        }
    }
}

impl From<TokenRow> for RefreshToken {
    fn from(row: TokenRow) -> Self {
        Self {
            token: row.token,
            account_id: row.account_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
            created_by_ip: row.created_by_ip,
            revoked_at: row.revoked_at,
            revoked_by_ip: row.revoked_by_ip,
            replaced_by_token: row.replaced_by_token,
        }
    }
}

// =============================================================================
// Token Storage
// =============================================================================

/// Pool-level refresh token reads.
pub struct TokenStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenStorage<'a> {
    /// Create a new token storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a token by value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_token(&self, token: &str) -> StorageResult<Option<TokenRow>> {
        let row: Option<RowTuple> = query_as(&format!(
            "SELECT {COLUMNS} FROM refresh_tokens WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(TokenRow::from_tuple))
    }

    /// Find the account's unrevoked, unexpired token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active_by_account(&self, account_id: &str) -> StorageResult<Option<TokenRow>> {
        let row: Option<RowTuple> = query_as(&format!(
            "SELECT {COLUMNS} FROM refresh_tokens \
             WHERE account_id = $1 AND revoked_at IS NULL AND expires_at > $2"
        ))
        .bind(account_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(TokenRow::from_tuple))
    }

    /// List every token of an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_account(&self, account_id: &str) -> StorageResult<Vec<TokenRow>> {
        let rows: Vec<RowTuple> = query_as(&format!(
            "SELECT {COLUMNS} FROM refresh_tokens \
             WHERE account_id = $1 ORDER BY created_at DESC"
        ))
        .bind(account_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(TokenRow::from_tuple).collect())
    }
}

// =============================================================================
// Transactional Queries
// =============================================================================

/// Find a token by value and lock its row.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_by_token_for_update(
    tx: &mut PgTransaction<'_>,
    token: &str,
) -> StorageResult<Option<TokenRow>> {
    let row: Option<RowTuple> = query_as(&format!(
        "SELECT {COLUMNS} FROM refresh_tokens WHERE token = $1 FOR UPDATE"
    ))
    .bind(token)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(TokenRow::from_tuple))
}

/// Find and lock the row occupying the account's unrevoked slot.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_unrevoked_by_account_for_update(
    tx: &mut PgTransaction<'_>,
    account_id: &str,
) -> StorageResult<Option<TokenRow>> {
    let row: Option<RowTuple> = query_as(&format!(
        "SELECT {COLUMNS} FROM refresh_tokens \
         WHERE account_id = $1 AND revoked_at IS NULL FOR UPDATE"
    ))
    .bind(account_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(TokenRow::from_tuple))
}

/// Insert a new token.
///
/// # Errors
///
/// Returns `Conflict` on a duplicate token or a second unrevoked row for the
/// account.
pub async fn insert(tx: &mut PgTransaction<'_>, token: &RefreshToken) -> StorageResult<()> {
    query(
        r#"
        INSERT INTO refresh_tokens
            (token, account_id, created_at, expires_at, created_by_ip,
             revoked_at, revoked_by_ip, replaced_by_token)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&token.token)
    .bind(&token.account_id)
    .bind(token.created_at)
    .bind(token.expires_at)
    .bind(&token.created_by_ip)
    .bind(token.revoked_at)
    .bind(&token.revoked_by_ip)
    .bind(&token.replaced_by_token)
    .execute(&mut **tx)
    .await
    .map_err(|e| StorageError::from_write(e, "refresh token insert"))?;

    Ok(())
}

/// Write the revocation fields of an unrevoked token.
///
/// # Errors
///
/// Returns `Conflict` if the row is already revoked, `NotFound` if it does
/// not exist.
pub async fn update_revocation(
    tx: &mut PgTransaction<'_>,
    token: &RefreshToken,
) -> StorageResult<()> {
    let result = query(REVOKE_SQL)
    .bind(&token.token)
    .bind(token.revoked_at)
    .bind(&token.revoked_by_ip)
    .bind(&token.replaced_by_token)
    .execute(&mut **tx)
    .await
    .map_err(|e| StorageError::from_write(e, "refresh token update"))?;

    if result.rows_affected() == 0 {
        let exists: Option<(String,)> =
            query_as("SELECT token FROM refresh_tokens WHERE token = $1")
                .bind(&token.token)
                .fetch_optional(&mut **tx)
                .await?;
        return Err(match exists {
            Some(_) => StorageError::conflict("refresh token was already revoked"),
            None => StorageError::not_found("refresh token"),
        });
    }
    Ok(())
}

/// Delete a token.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn delete(tx: &mut PgTransaction<'_>, token: &str) -> StorageResult<()> {
    query("DELETE FROM refresh_tokens WHERE token = $1")
        .bind(token)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_revocation_only_touches_unrevoked_rows() {
        assert!(REVOKE_SQL.contains("WHERE token = $1 AND revoked_at IS NULL"));
    }

    #[test]
    fn test_row_conversion() {
        let now = OffsetDateTime::now_utc();
        let row = TokenRow::from_tuple((
            "tok".to_string(),
            "acc-1".to_string(),
            now,
            now + Duration::days(7),
            "1.1.1.1".to_string(),
            Some(now),
            Some("2.2.2.2".to_string()),
            None,
        ));

        let token = RefreshToken::from(row);
        assert_eq!(token.account_id, "acc-1");
        assert_eq!(token.expires_at, now + Duration::days(7));
        assert_eq!(token.revoked_by_ip.as_deref(), Some("2.2.2.2"));
        assert!(token.replaced_by_token.is_none());
        assert!(token.is_revoked());
    }
}
