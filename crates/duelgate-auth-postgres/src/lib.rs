//! PostgreSQL storage backend for duelgate-auth
//!
//! Provides persistent storage for refresh tokens in the `refresh_tokens`
//! table. The single-active-token policy is enforced by the table's filtered
//! unique index, so concurrent logins and rotations served by different
//! processes still leave at most one live session per account.
//!
//! # Example
//!
//! ```ignore
//! use duelgate_auth_postgres::PostgresAuthStorage;
//!
//! let storage = PostgresAuthStorage::connect("postgres://localhost/duelgate", 10).await?;
//! storage.migrate().await?;
//!
//! let store = Arc::new(storage.refresh_token_store());
//! let auth = AuthenticationCoordinator::new(&config, store, directory)?;
//! ```

pub mod migrations;
pub mod store;
pub mod token;
pub mod transaction;

use std::sync::Arc;

use duelgate_auth::AuthError;
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use store::PostgresRefreshTokenStore;
pub use token::{TokenRow, TokenStorage};
pub use transaction::PostgresRefreshTokenTransaction;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Requested row was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(String),

    /// The transaction was already committed or rolled back.
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl StorageError {
    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a `Transaction` error.
    #[must_use]
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction(message.into())
    }

    /// Maps a database error, turning unique violations into `Conflict`.
    #[must_use]
    pub fn from_write(err: sqlx_core::Error, what: &str) -> Self {
        if let sqlx_core::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::conflict(format!(
                "{what} violates {}",
                db_err.constraint().unwrap_or("a unique constraint")
            ));
        }
        Self::from(err)
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        if err.is_database_error() {
            tracing::error!(error = %err, "Refresh token storage failure");
        }
        match err {
            StorageError::Conflict(message) => AuthError::conflict(message),
            other => AuthError::storage(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend for authentication data.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `Migration` if a migration fails.
    pub async fn migrate(&self) -> StorageResult<()> {
        migrations::run(&self.pool).await
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get refresh token query operations.
    #[must_use]
    pub fn refresh_tokens(&self) -> TokenStorage<'_> {
        TokenStorage::new(&self.pool)
    }

    /// Get a [`RefreshTokenStore`](duelgate_auth::RefreshTokenStore) sharing this pool.
    #[must_use]
    pub fn refresh_token_store(&self) -> PostgresRefreshTokenStore {
        PostgresRefreshTokenStore::new(Arc::clone(&self.pool))
    }
}

// =============================================================================
// Tests
// =============================================================================
