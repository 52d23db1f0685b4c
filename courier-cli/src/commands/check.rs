//! Check command - probe the configured base URL.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use courier_fetch::Probe;
use courier_store::ClientConfig;

use crate::output::{JsonFormatter, ProbeOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// URL to probe instead of the configured base URL.
    #[arg(long)]
    pub url: Option<String>,

    /// Probe timeout in seconds.
    #[arg(long, default_value = "5")]
    pub timeout: u64,
}

/// Runs the check command.
pub async fn run(args: &CheckArgs, cli: &Cli, config: &ClientConfig) -> Result<()> {
    let url = args.url.as_deref().unwrap_or(&config.base_url);
    let client = reqwest::Client::builder().build()?;
    let result = Probe::new(url)
        .with_timeout(Duration::from_secs(args.timeout))
        .check(&client)
        .await;

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_probe(url, &result));
        }
        OutputFormat::Json => {
            let output = ProbeOutput::new(url, &result);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    if !result.online {
        std::process::exit(ExitCode::Offline as i32);
    }

    Ok(())
}
