use clap::Subcommand;
use serde_json::json;

use crate::auth::{JwtKeys, Scope};
use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token signed with JWT_SECRET")]
    Issue {
        #[arg(long, help = "Token subject: an encoded user id or a service name")]
        subject: String,
        #[arg(long, default_value = "read", help = "Scope: admin, read or self")]
        scope: Scope,
    },
}

pub fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { subject, scope } => {
            // Same secret and expiry the server validates against.
            let config = AppConfig::from_env()?;
            let keys = JwtKeys::from_config(&config.security)?;
            let token = keys.issue(subject, scope)?;
            output_value(output_format, "token", "Token", json!(token))
        }
    }
}
