use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use duelgate_auth::AccessTokenIssuer;
use rand::RngCore;

use crate::cli::{OutputFormat, VerifyArgs};
use crate::output::print_claims;
use crate::settings::AppConfig;

/// Secret size printed by `generate-secret`, in bytes.
const SECRET_BYTES: usize = 64;

pub fn verify(cfg: &AppConfig, args: &VerifyArgs, format: OutputFormat) -> Result<()> {
    let issuer = AccessTokenIssuer::from_config(&cfg.auth)?;
    let claims = issuer
        .verify(&args.token)
        .context("Access token rejected")?;
    print_claims(&claims, format)
}

pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
