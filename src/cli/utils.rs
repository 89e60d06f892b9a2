use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Print a single labelled value: `label: value` as text, `{key: value}` as JSON.
pub fn output_value(
    output_format: OutputFormat,
    key: &str,
    label: &str,
    value: Value,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ key: value }))?);
        }
        OutputFormat::Text => match value {
            Value::String(s) => println!("{}: {}", label, s),
            other => println!("{}: {}", label, other),
        },
    }
    Ok(())
}

/// Print any serializable payload; text output is pretty-printed.
pub fn output_document<T: Serialize>(
    output_format: OutputFormat,
    document: &T,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string(document)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(document)?),
    }
    Ok(())
}
