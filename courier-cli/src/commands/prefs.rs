//! Prefs command - durable user preferences.

use anyhow::Result;
use clap::{Args, Subcommand};
use courier_fetch::KeyValueStorage;
use courier_store::FilePreferences;

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the prefs command.
#[derive(Args)]
pub struct PrefsArgs {
    #[command(subcommand)]
    pub action: PrefsAction,
}

/// Prefs subcommands.
#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show one preference, or all of them.
    Get {
        /// Preference key (e.g. language, currency).
        key: Option<String>,
    },

    /// Set a preference.
    Set {
        /// Preference key.
        key: String,
        /// New value.
        value: String,
    },

    /// Remove a preference.
    Unset {
        /// Preference key.
        key: String,
    },
}

/// Runs the prefs command.
pub async fn run(args: &PrefsArgs, cli: &Cli) -> Result<()> {
    let prefs = FilePreferences::open_default().await;

    match &args.action {
        PrefsAction::Get { key: Some(key) } => {
            let value = prefs.get(key);
            match cli.format {
                OutputFormat::Text => println!("{}", value.as_deref().unwrap_or("")),
                OutputFormat::Json => {
                    let output = serde_json::json!({ "key": key, "value": value });
                    println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
                }
            }
        }
        PrefsAction::Get { key: None } => {
            let all = prefs.all();
            match cli.format {
                OutputFormat::Text => {
                    for (key, value) in &all {
                        println!("{key:<15} {value}");
                    }
                }
                OutputFormat::Json => {
                    println!("{}", JsonFormatter::new(cli.pretty).format(&all)?);
                }
            }
        }
        PrefsAction::Set { key, value } => {
            prefs.set(key, value).await?;
            println!("{key} = {value}");
        }
        PrefsAction::Unset { key } => {
            prefs.remove(key).await?;
            println!("Removed {key}");
        }
    }

    Ok(())
}
