//! Config command - manage configuration.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use courier_store::{
    ClientConfig, default_config_dir, default_data_dir, default_preferences_path,
    default_tokens_path,
};
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration and storage paths.
    Path,

    /// Write the default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
///
/// `config` is `None` when the file exists but could not be loaded; only
/// `path`, `init --force` and `reset` are useful then.
pub async fn run(args: &ConfigArgs, cli: &Cli, config: Option<ClientConfig>) -> Result<()> {
    match &args.action {
        ConfigAction::Show => match config {
            Some(config) => show_config(&config, cli),
            None => bail!("Configuration file is invalid; run `courier config reset`"),
        },
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Init { force } => init_config(*force, cli).await,
        ConfigAction::Reset => reset_config(cli).await,
    }
}

fn show_config(config: &ClientConfig, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_config(config));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(config)?);
        }
    }
    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let data_dir = default_data_dir();
    let config_file = cli.config_path();
    let tokens_file = default_tokens_path();
    let preferences_file = default_preferences_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:       {}", config_dir.display());
            println!("Data dir:         {}", data_dir.display());
            println!("Config file:      {}", config_file.display());
            println!("Token file:       {}", tokens_file.display());
            println!("Preferences file: {}", preferences_file.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "data_dir": data_dir.display().to_string(),
                "config_file": config_file.display().to_string(),
                "tokens_file": tokens_file.display().to_string(),
                "preferences_file": preferences_file.display().to_string(),
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&paths)?);
        }
    }

    Ok(())
}

async fn init_config(force: bool, cli: &Cli) -> Result<()> {
    let path = cli.config_path();
    if !force && tokio::fs::try_exists(&path).await? {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }

    ClientConfig::default().save_to(&path).await?;
    info!(path = %path.display(), "Configuration written");
    println!("Wrote {}", path.display());

    Ok(())
}

async fn reset_config(cli: &Cli) -> Result<()> {
    let path = cli.config_path();

    if tokio::fs::try_exists(&path).await? {
        tokio::fs::remove_file(&path).await?;
        info!(path = %path.display(), "Configuration reset");
        println!("Configuration reset to defaults");
    } else {
        println!("No configuration file to reset");
    }

    Ok(())
}
