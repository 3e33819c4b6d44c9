use anyhow::{Context, Result};
use appdata_service::{AppData, AppDataCli, AppDataConfig, Method};
use appdata_storage::FileSystemDocumentBackend;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
pub async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = AppDataCli::parse();

    let config = AppDataConfig::from_env()?;
    let backend = FileSystemDocumentBackend::new(&cli.root).await?;
    let app = AppData::new(config, backend)?;

    let method: Method = cli.method.parse()?;
    let body = cli
        .body
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--body is not valid JSON")?;

    let authorization = format!("Bearer {}", cli.token);

    match app
        .handle_bearer(Some(&authorization), method, &cli.path, body)
        .await
    {
        Ok(response) => {
            println!("{}", response.to_body_string());
            Ok(())
        }
        Err(error) => {
            eprintln!("{} {error}", error.status());
            std::process::exit(1);
        }
    }
}
