pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "rbac")]
#[command(about = "Operator tools for the RBAC admin API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Encode or decode opaque identifiers")]
    Id {
        #[command(subcommand)]
        cmd: commands::id::IdCommands,
    },

    #[command(about = "Mint API bearer tokens")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Fetch permission trees from a running server")]
    Tree(commands::tree::TreeArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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
        Commands::Id { cmd } => commands::id::handle(cmd, output_format),
        Commands::Token { cmd } => commands::token::handle(cmd, output_format),
        Commands::Tree(args) => commands::tree::handle(args, output_format).await,
    }
}
