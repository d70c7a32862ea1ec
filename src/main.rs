use anyhow::Result;
use clap::Parser;
use click_tracker::cli::commands::{health_command, serve_command, ServeCommand};
use click_tracker::cli::{Cli, Commands};
use click_tracker::config::Config;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.env_file.as_deref())?;
    info!("Starting click-tracker");

    match cli.command.unwrap_or_else(|| Commands::Serve(ServeCommand::default())) {
        Commands::Serve(args) => serve_command(args, config).await,
        Commands::Health(args) => health_command(args, config).await,
    }
}
