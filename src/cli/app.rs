use super::commands::{HealthCommand, ServeCommand};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "click-tracker")]
#[command(about = "Click-tracking service that counts clicks on CRM contacts")]
pub struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve(ServeCommand),
    /// Probe the CRM connection once and print the result
    Health(HealthCommand),
}
