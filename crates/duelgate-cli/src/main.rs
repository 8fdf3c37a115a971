mod cli;
mod commands;
mod observability;
mod output;
mod settings;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;
use settings::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    observability::init_tracing_with_level("warn");

    let cli = Cli::parse();

    if let Commands::GenerateSecret = cli.command {
        println!("{}", commands::token::generate_secret());
        return;
    }

    let cfg = match settings::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            print_error(&format!("Configuration error: {e}"));
            std::process::exit(2);
        }
    };
    observability::apply_logging_level(&cfg.logging.level);

    if let Err(e) = run(cli, &cfg).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, cfg: &AppConfig) -> Result<()> {
    let format = cli.format.unwrap_or_default();

    if let Commands::Verify(args) = &cli.command {
        return commands::token::verify(cfg, args, format);
    }

    let storage = commands::connect(cfg, cli.database_url.as_deref()).await?;
    match &cli.command {
        Commands::Migrate => commands::migrate(&storage).await,
        Commands::Login(args) => commands::session::login(cfg, &storage, args, format).await,
        Commands::Refresh(args) => commands::session::refresh(cfg, &storage, args, format).await,
        Commands::Revoke(args) => commands::session::revoke(cfg, &storage, args).await,
        Commands::RevokeAccount(args) => {
            commands::session::revoke_account(cfg, &storage, args).await
        }
        Commands::Inspect(args) => commands::session::inspect(cfg, &storage, args, format).await,
        Commands::Sessions(args) => commands::session::sessions(&storage, args, format).await,
        Commands::Verify(_) | Commands::GenerateSecret => Ok(()),
    }
}
