// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Courier CLI - drive the exchange client from the command line.
//!
//! # Examples
//!
//! ```bash
//! # GET with query parameters
//! courier exchange get /orders --data '{"page": 1}'
//!
//! # POST with a templated path
//! courier exchange post '/users/{id}' --data '{"id": 5, "name": "Ann"}'
//!
//! # Stored credential state
//! courier token show
//!
//! # JSON output
//! courier --format json --pretty config show
//!
//! # Is the API reachable?
//! courier check
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use courier_fetch::ExchangeError;
use courier_store::{ClientConfig, LogLevel};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{check, config, exchange, prefs, token};

// ============================================================================
// CLI Definition
// ============================================================================

/// Courier CLI - HTTP exchanges with managed credentials.
#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "HTTP exchange client with managed credentials")]
#[command(long_about = r#"
Courier sends requests through the exchange pipeline: URL templating,
currency/locale/bearer headers, response envelopes and single-flight
credential refresh.

Examples:
  courier exchange get /orders          # GET relative to base URL
  courier x post /orders -d '{"id":1}'  # POST a JSON payload
  courier token show                    # Stored credential state
  courier prefs set language zh-TW      # Durable preference
  courier check                         # Probe the base URL
"#)]
#[command(version)]
#[command(author = "Courier Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Configuration file (defaults to the user config directory).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Path of the configuration file in use.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(ClientConfig::default_path)
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Send a request through the exchange pipeline.
    #[command(visible_alias = "x")]
    Exchange(exchange::ExchangeArgs),

    /// Inspect or manage stored credentials.
    #[command(visible_alias = "t")]
    Token(token::TokenArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),

    /// Manage durable preferences (language, currency).
    Prefs(prefs::PrefsArgs),

    /// Check whether the base URL is reachable.
    Check(check::CheckArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Session invalid; sign in again.
    Unauthorized = 2,
    /// Host offline.
    Offline = 3,
    /// Refresh rate limit hit.
    RateLimited = 4,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ExchangeError>() {
            Some(ExchangeError::Offline { .. }) => Self::Offline,
            Some(ExchangeError::RefreshRateLimited { .. }) => Self::RateLimited,
            Some(e) if e.is_unauthorized() => Self::Unauthorized,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("courier=debug,info")
        } else {
            EnvFilter::new(format!("courier={level}"))
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging needs the configured level, so a broken file is reported after init.
    let loaded = ClientConfig::load_from(&cli.config_path()).await;
    let level = loaded.as_ref().map(|c| c.log_level).unwrap_or_default();
    setup_logging(cli.verbose, cli.quiet, level);

    let result = match loaded {
        Ok(loaded) => {
            debug!(base_url = %loaded.base_url, "Configuration loaded");
            run(&cli, loaded).await
        }
        // Config commands must still work on an unreadable file.
        Err(e) => match &cli.command {
            Commands::Config(args) => config::run(args, &cli, None).await,
            _ => Err(e.into()),
        },
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}

async fn run(cli: &Cli, loaded: ClientConfig) -> Result<()> {
    match &cli.command {
        Commands::Exchange(args) => exchange::run(args, cli, &loaded).await,
        Commands::Token(args) => token::run(args, cli, &loaded).await,
        Commands::Config(args) => config::run(args, cli, Some(loaded)).await,
        Commands::Prefs(args) => prefs::run(args, cli).await,
        Commands::Check(args) => check::run(args, cli, &loaded).await,
    }
}
