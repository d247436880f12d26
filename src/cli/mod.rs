pub mod utils;

use clap::{Parser, Subcommand};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{password::hash_password, Claims, TokenKeys};
use crate::config::AppConfig;
use utils::{output_error, output_success};

#[derive(Parser)]
#[command(name = "bcard")]
#[command(about = "BizCard admin CLI - password hashes and tokens for operators")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Hash a plaintext password for seeding the users store")]
    HashPassword { password: String },

    #[command(about = "Issue a token signed with the configured JWT secret")]
    Token {
        #[arg(long)]
        user_id: Uuid,
        #[arg(long)]
        admin: bool,
        #[arg(long)]
        business: bool,
        #[arg(long, help = "Override security.jwt_expiry_hours")]
        expiry_hours: Option<u64>,
    },

    #[command(about = "Verify a token and print its claims")]
    Verify { token: String },

    #[command(about = "Print the effective configuration (secrets omitted)")]
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::HashPassword { password } => {
            let hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
            output_success(&output_format, "Password hashed", json!({ "hash": hash }))
        }
        Commands::Token {
            user_id,
            admin,
            business,
            expiry_hours,
        } => {
            let keys = signing_keys()?;
            let hours = expiry_hours.unwrap_or_else(|| keys.expiry_hours());
            let token = keys.sign(Claims::new(user_id, admin, business, hours))?;
            output_success(
                &output_format,
                "Token issued",
                json!({ "token": token, "expires_in_hours": hours }),
            )
        }
        Commands::Verify { token } => match signing_keys()?.verify(&token) {
            Ok(claims) => output_success(&output_format, "Token is valid", json!(claims)),
            Err(e) => {
                output_error(&output_format, &e.to_string())?;
                anyhow::bail!("token rejected")
            }
        },
        Commands::Config => {
            let config = AppConfig::from_env();
            output_success(&output_format, "Effective configuration", serde_json::to_value(&config)?)
        }
    }
}

/// Tokens must verify against the running server, so a random fallback secret is useless here.
fn signing_keys() -> anyhow::Result<TokenKeys> {
    let config = AppConfig::from_env();
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET is not set");
    }
    Ok(TokenKeys::new(&config.security.jwt_secret, config.security.jwt_expiry_hours))
}
