use anyhow::Result;
use colored::Colorize;
use duelgate_auth::{AccessTokenClaims, RefreshToken, TokenPair};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cli::OutputFormat;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_pair(pair: &TokenPair, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(pair),
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["Access token", pair.access_token.as_str()]);
            builder.push_record([
                "Access expires".to_string(),
                timestamp(pair.access_token_expires_at),
            ]);
            builder.push_record(["Refresh token", pair.refresh_token.as_str()]);
            builder.push_record([
                "Refresh expires".to_string(),
                timestamp(pair.refresh_token_expires_at),
            ]);
            println!("{}", builder.build().with(Style::rounded()));
            Ok(())
        }
    }
}

pub fn print_tokens(tokens: &[RefreshToken], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&tokens),
        OutputFormat::Table => {
            if tokens.is_empty() {
                println!("No refresh tokens found.");
                return Ok(());
            }
            let now = OffsetDateTime::now_utc();
            let mut builder = Builder::default();
            builder.push_record([
                "Token",
                "Account",
                "State",
                "Created",
                "Expires",
                "Created by",
                "Revoked by",
                "Replaced by",
            ]);
            for token in tokens {
                builder.push_record([
                    abbreviate(&token.token),
                    token.account_id.clone(),
                    colored_state(token, now),
                    timestamp(token.created_at),
                    timestamp(token.expires_at),
                    token.created_by_ip.clone(),
                    token.revoked_by_ip.clone().unwrap_or_else(|| "-".to_string()),
                    token
                        .replaced_by_token
                        .as_deref()
                        .map(abbreviate)
                        .unwrap_or_else(|| "-".to_string()),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
            Ok(())
        }
    }
}

pub fn print_claims(claims: &AccessTokenClaims, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(claims),
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["Subject", claims.sub.as_str()]);
            builder.push_record(["Token id", claims.jti.as_str()]);
            builder.push_record(["Issuer", claims.iss.as_str()]);
            builder.push_record(["Audience", claims.aud.as_str()]);
            builder.push_record(["Email", claims.email.as_deref().unwrap_or("-")]);
            builder.push_record(["Roles".to_string(), claims.roles.join(", ")]);
            builder.push_record(["Expires".to_string(), unix_timestamp(claims.exp)]);
            println!("{}", builder.build().with(Style::rounded()));
            Ok(())
        }
    }
}

fn colored_state(token: &RefreshToken, now: OffsetDateTime) -> String {
    let state = token.state_at(now);
    let label = state.to_string();
    match state {
        duelgate_auth::TokenState::Active => label.green().to_string(),
        duelgate_auth::TokenState::Expired => label.yellow().to_string(),
        _ => label.red().to_string(),
    }
}

fn abbreviate(token: &str) -> String {
    match token.get(..12) {
        Some(prefix) if token.len() > 12 => format!("{prefix}…"),
        _ => token.to_string(),
    }
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

fn unix_timestamp(secs: i64) -> String {
    OffsetDateTime::from_unix_timestamp(secs)
        .map(timestamp)
        .unwrap_or_else(|_| secs.to_string())
}
