use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "duelgate")]
#[command(about = "duelgate session credentials: issue, rotate, revoke and inspect tokens")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./duelgate.toml when present)
    #[arg(short, long, global = true, env = "DUELGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database URL (overrides database.url from config)
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or upgrade the refresh token schema
    Migrate,
    /// Issue a token pair for an already verified account
    Login(LoginArgs),
    /// Exchange a refresh token for a new token pair
    Refresh(RefreshArgs),
    /// Revoke a refresh token
    Revoke(RevokeArgs),
    /// Revoke the active session of an account
    RevokeAccount(RevokeAccountArgs),
    /// Show a stored refresh token
    Inspect(InspectArgs),
    /// List every refresh token issued to an account
    Sessions(SessionsArgs),
    /// Validate an access token and print its claims
    Verify(VerifyArgs),
    /// Print a new random signing secret
    GenerateSecret,
}

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Account id (becomes the token subject)
    pub account_id: String,
    /// Role to embed in the access token (repeatable)
    #[arg(short, long = "role")]
    pub roles: Vec<String>,
    /// Email to embed in the access token
    #[arg(long)]
    pub email: Option<String>,
    /// Client address the session is bound to
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,
}

#[derive(clap::Args)]
pub struct RefreshArgs {
    /// Refresh token to rotate
    pub token: String,
    /// Role to embed in the new access token (repeatable)
    #[arg(short, long = "role")]
    pub roles: Vec<String>,
    /// Email to embed in the new access token
    #[arg(long)]
    pub email: Option<String>,
    /// Client address; must match the one the token was issued to
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,
}

#[derive(clap::Args)]
pub struct RevokeArgs {
    /// Refresh token to revoke
    pub token: String,
    /// Address recorded as the revoker
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,
}

#[derive(clap::Args)]
pub struct RevokeAccountArgs {
    /// Account whose active session is revoked
    pub account_id: String,
    /// Address recorded as the revoker
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,
}

#[derive(clap::Args)]
pub struct InspectArgs {
    /// Refresh token to look up
    pub token: String,
}

#[derive(clap::Args)]
pub struct SessionsArgs {
    /// Account id
    pub account_id: String,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Access token (compact JWT)
    pub token: String,
}
