use anyhow::Result;
use capture_hub::{
    app,
    cli::{handle_sdk_command, Cli, CliCommand},
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("capture-hub {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Serve) | None => {}
        Some(command) => {
            handle_sdk_command(command).await?;
            return Ok(());
        }
    }

    app::run_service().await
}
