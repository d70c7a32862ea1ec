use crate::api::CrmClient;
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug, Default)]
pub struct HealthCommand {
    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}

/// Run one CRM health probe; fails when the CRM is unhealthy
pub async fn health_command(args: HealthCommand, config: Config) -> Result<()> {
    config.ensure_valid()?;
    let client = CrmClient::from_config(&config)?;
    let report = client.check_api_health().await;

    let output = if args.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
    .context("Failed to serialize health report")?;
    println!("{}", output);

    if !report.is_healthy() {
        anyhow::bail!("CRM is unhealthy: {}", report.message);
    }
    Ok(())
}
