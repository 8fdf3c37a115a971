//! Embedded schema migrations.
//!
//! Migrations are compiled into the binary and tracked in the
//! `_sqlx_migrations` table, so no migration files need to ship alongside it.
//!
//! To add a migration, create the SQL file under `migrations/` and append an
//! entry to `embedded_migrations!()`.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use tracing::{info, instrument};

use crate::{PgPool, StorageError, StorageResult};

macro_rules! embedded_migrations {
    () => {
        &[(
            20261019000001i64,
            "refresh_tokens",
            include_str!("../migrations/20261019000001_refresh_tokens.sql"),
        )]
    };
}

/// Embedded migrations in version order.
#[must_use]
pub fn migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Runs all pending migrations.
///
/// # Errors
///
/// Returns `Migration` if a migration fails to apply.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> StorageResult<()> {
    let migrations = migrations();
    info!(count = migrations.len(), "Running refresh token migrations");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))?;

    info!("Refresh token migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered() {
        let migrations = migrations();
        assert!(!migrations.is_empty());
        assert!(
            migrations
                .windows(2)
                .all(|pair| pair[0].version < pair[1].version)
        );
    }

    #[test]
    fn test_schema_enforces_single_unrevoked_row() {
        let sql = &migrations()[0].sql;
        assert!(sql.contains("CREATE UNIQUE INDEX IF NOT EXISTS ux_refresh_tokens_account_unrevoked"));
        assert!(sql.contains("WHERE revoked_at IS NULL"));
        assert!(sql.contains("token             VARCHAR(200) PRIMARY KEY"));
        assert!(sql.contains("created_by_ip     VARCHAR(45)  NOT NULL"));
    }
}
