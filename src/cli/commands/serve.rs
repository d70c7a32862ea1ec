use crate::config::Config;
use crate::server;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Default)]
pub struct ServeCommand {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Apply CLI overrides, validate the config and run the server
pub async fn serve_command(args: ServeCommand, mut config: Config) -> Result<()> {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    config.ensure_valid()?;
    server::run_server(config).await
}
