use anyhow::Result;
use clap::Parser;
use manager::cli::{Cli, run};
use manager::config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;
    tracing::info!(
        api = %cfg.tron.api_url,
        profile = ?cli.profile,
        api_key = cfg.tron.api_key.is_some(),
        "config loaded"
    );

    if let Err(err) = run(cli, cfg).await {
        if let Some(hint) = tron::error::classify_error(&err).hint() {
            eprintln!("hint: {hint}");
        }
        return Err(err);
    }
    Ok(())
}
