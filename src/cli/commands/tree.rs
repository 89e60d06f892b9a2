use anyhow::{bail, Context};
use clap::Args;
use serde_json::Value;

use crate::cli::utils::output_document;
use crate::cli::OutputFormat;

#[derive(Args)]
pub struct TreeArgs {
    #[arg(long, help = "Encoded user id; omit to fetch every user's tree")]
    pub user: Option<String>,

    #[arg(long, default_value = "http://localhost:3000", help = "API base URL")]
    pub server: String,

    #[arg(long, help = "Bearer token")]
    pub token: String,
}

impl TreeArgs {
    fn endpoint(&self) -> anyhow::Result<url::Url> {
        let base = url::Url::parse(&self.server)
            .with_context(|| format!("invalid server url {}", self.server))?;
        let path = match &self.user {
            Some(user) => format!("/api/v1/usuarios/{}/permisos", user),
            None => "/api/v1/permisos-usuarios".to_string(),
        };
        Ok(base.join(&path)?)
    }
}

pub async fn handle(args: TreeArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let url = args.endpoint()?;
    tracing::debug!("GET {}", url);

    let response = reqwest::Client::new()
        .get(url)
        .bearer_auth(&args.token)
        .send()
        .await?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .context("server returned a non-JSON body")?;
    if !status.is_success() {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        bail!("{} ({})", message, status);
    }

    output_document(output_format, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(user: Option<&str>, server: &str) -> TreeArgs {
        TreeArgs {
            user: user.map(str::to_string),
            server: server.to_string(),
            token: "t".to_string(),
        }
    }

    #[test]
    fn endpoint_for_all_users() {
        let url = args(None, "http://localhost:3000").endpoint().unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/v1/permisos-usuarios");
    }

    #[test]
    fn endpoint_for_one_user() {
        let url = args(Some("MQ"), "http://api.local:8080/").endpoint().unwrap();
        assert_eq!(url.as_str(), "http://api.local:8080/api/v1/usuarios/MQ/permisos");
    }

    #[test]
    fn rejects_bad_server_url() {
        assert!(args(None, "not a url").endpoint().is_err());
    }
}
