pub mod session;
pub mod token;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use duelgate_auth::{AccountIdentity, AuthenticationCoordinator, StaticAccountDirectory};
use duelgate_auth_postgres::PostgresAuthStorage;

use crate::output::print_success;
use crate::settings::AppConfig;

/// Connects to the configured database.
pub async fn connect(cfg: &AppConfig, database_url: Option<&str>) -> Result<PostgresAuthStorage> {
    let url = database_url.unwrap_or(&cfg.database.url);
    if url.is_empty() {
        bail!("No database URL: set database.url, DUELGATE__DATABASE__URL or --database-url");
    }
    tracing::debug!(max_connections = cfg.database.max_connections, "connecting to database");
    PostgresAuthStorage::connect(url, cfg.database.max_connections)
        .await
        .context("Failed to connect to database")
}

/// Builds a coordinator whose account directory knows only `identity`.
///
/// The CLI acts as the identity provider: whoever runs it vouches for the
/// account and its roles.
pub fn coordinator(
    cfg: &AppConfig,
    storage: &PostgresAuthStorage,
    identity: AccountIdentity,
) -> Result<AuthenticationCoordinator> {
    let directory = Arc::new(StaticAccountDirectory::with_accounts([identity]));
    let store = Arc::new(storage.refresh_token_store());
    Ok(AuthenticationCoordinator::new(&cfg.auth, store, directory)?)
}

pub async fn migrate(storage: &PostgresAuthStorage) -> Result<()> {
    storage.migrate().await.context("Migration failed")?;
    print_success("Refresh token schema is up to date");
    Ok(())
}
