use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::codec;

#[derive(Subcommand)]
pub enum IdCommands {
    #[command(about = "Encode a numeric id into its opaque form")]
    Encode {
        #[arg(help = "Numeric primary key")]
        id: i64,
    },

    #[command(about = "Decode an opaque id back into its numeric form")]
    Decode {
        #[arg(help = "Opaque identifier, e.g. MQ==")]
        opaque: String,
    },
}

pub fn handle(cmd: IdCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        IdCommands::Encode { id } => {
            output_value(output_format, "id", "Encoded", json!(codec::encode(id)))
        }
        IdCommands::Decode { opaque } => {
            let id = codec::decode(&opaque)?;
            output_value(output_format, "id", "Decoded", json!(id))
        }
    }
}
