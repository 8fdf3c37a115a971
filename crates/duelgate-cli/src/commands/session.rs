use anyhow::{Result, anyhow};
use duelgate_auth::{AccountIdentity, RefreshTokenStore};
use duelgate_auth_postgres::PostgresAuthStorage;

use crate::cli::{
    InspectArgs, LoginArgs, OutputFormat, RefreshArgs, RevokeAccountArgs, RevokeArgs, SessionsArgs,
};
use crate::commands::coordinator;
use crate::output::{print_pair, print_success, print_tokens};
use crate::settings::AppConfig;

fn identity(account_id: &str, roles: &[String], email: Option<&String>) -> AccountIdentity {
    let identity = AccountIdentity::new(account_id).with_roles(roles.iter().cloned());
    match email {
        Some(email) => identity.with_email(email.clone()),
        None => identity,
    }
}

pub async fn login(
    cfg: &AppConfig,
    storage: &PostgresAuthStorage,
    args: &LoginArgs,
    format: OutputFormat,
) -> Result<()> {
    let identity = identity(&args.account_id, &args.roles, args.email.as_ref());
    let auth = coordinator(cfg, storage, identity.clone())?;
    let pair = auth.authenticate(&identity, &args.ip).await?;
    print_pair(&pair, format)
}

pub async fn refresh(
    cfg: &AppConfig,
    storage: &PostgresAuthStorage,
    args: &RefreshArgs,
    format: OutputFormat,
) -> Result<()> {
    let record = storage
        .refresh_token_store()
        .find_by_token(&args.token)
        .await?
        .ok_or_else(|| anyhow!("Refresh token not found"))?;

    let identity = identity(&record.account_id, &args.roles, args.email.as_ref());
    let auth = coordinator(cfg, storage, identity)?;
    let pair = auth.refresh(&args.token, &args.ip).await?;
    print_pair(&pair, format)
}

pub async fn revoke(cfg: &AppConfig, storage: &PostgresAuthStorage, args: &RevokeArgs) -> Result<()> {
    let auth = coordinator(cfg, storage, AccountIdentity::new("operator"))?;
    let revoked = auth.revocation().revoke(&args.token, &args.ip).await?;
    print_success(&format!(
        "Revoked refresh token of account {}",
        revoked.account_id
    ));
    Ok(())
}

pub async fn revoke_account(
    cfg: &AppConfig,
    storage: &PostgresAuthStorage,
    args: &RevokeAccountArgs,
) -> Result<()> {
    let auth = coordinator(cfg, storage, AccountIdentity::new(args.account_id.clone()))?;
    match auth
        .revocation()
        .revoke_for_account(&args.account_id, &args.ip)
        .await?
    {
        Some(_) => print_success(&format!("Revoked active session of {}", args.account_id)),
        None => println!("Account {} has no active session.", args.account_id),
    }
    Ok(())
}

pub async fn inspect(
    cfg: &AppConfig,
    storage: &PostgresAuthStorage,
    args: &InspectArgs,
    format: OutputFormat,
) -> Result<()> {
    let auth = coordinator(cfg, storage, AccountIdentity::new("operator"))?;
    let record = auth
        .inspect(&args.token)
        .await?
        .ok_or_else(|| anyhow!("Refresh token not found"))?;
    print_tokens(std::slice::from_ref(&record), format)
}

pub async fn sessions(
    storage: &PostgresAuthStorage,
    args: &SessionsArgs,
    format: OutputFormat,
) -> Result<()> {
    let tokens = storage
        .refresh_token_store()
        .list_by_account(&args.account_id)
        .await?;
    print_tokens(&tokens, format)
}
