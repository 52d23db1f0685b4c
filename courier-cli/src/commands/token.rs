//! Token command - inspect and manage stored credentials.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use courier_core::{decode_claims, expiry_of};
use courier_fetch::CredentialStore;
use courier_store::{ClientConfig, default_tokens_path, open_token_storage};
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter, TokenStatus};
use crate::{Cli, OutputFormat};

/// Arguments for the token command.
#[derive(Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub action: TokenAction,
}

/// Token subcommands.
#[derive(Subcommand)]
pub enum TokenAction {
    /// Show which tokens are stored. Values are never printed.
    Show,

    /// Remove all stored tokens and the signed-in marker.
    Clear,

    /// Store a token pair, e.g. from an external sign-in.
    Set {
        /// Access token.
        access: String,
        /// Refresh token.
        refresh: String,
        /// Mark the session as signed in.
        #[arg(long)]
        signed_in: bool,
    },
}

/// Runs the token command.
pub async fn run(args: &TokenArgs, cli: &Cli, config: &ClientConfig) -> Result<()> {
    let storage = open_token_storage(config.token_backend, default_tokens_path()).await;
    let credentials = CredentialStore::new(storage);

    match &args.action {
        TokenAction::Show => {
            let status = token_status(&credentials, config).await;
            match cli.format {
                OutputFormat::Text => {
                    let formatter = TextFormatter::new(!cli.no_color);
                    println!("{}", formatter.format_token_status(&status, Utc::now()));
                }
                OutputFormat::Json => {
                    println!("{}", JsonFormatter::new(cli.pretty).format(&status)?);
                }
            }
        }
        TokenAction::Clear => {
            credentials.clear().await?;
            info!(backend = %config.token_backend, "Credentials cleared");
            println!("Credentials cleared");
        }
        TokenAction::Set {
            access,
            refresh,
            signed_in,
        } => {
            let credential = credentials.store_tokens(access, refresh).await?;
            if *signed_in {
                credentials.mark_signed_in().await?;
            }
            info!(
                backend = %config.token_backend,
                refresh_expiry = ?credential.refresh_expiry,
                "Credentials stored"
            );
            println!("Credentials stored");
        }
    }

    Ok(())
}

/// Summarizes stored credentials without exposing token values.
pub async fn token_status(credentials: &CredentialStore, config: &ClientConfig) -> TokenStatus {
    let access = credentials.access_token().await;
    let refresh = credentials.refresh_token().await;

    TokenStatus {
        backend: config.token_backend.to_string(),
        signed_in: credentials.is_signed_in().await,
        access_token: access.is_some(),
        refresh_token: refresh.is_some(),
        refresh_expiry: refresh.as_deref().and_then(expiry_of),
        subject: access
            .as_deref()
            .and_then(|token| decode_claims(token).ok())
            .and_then(|claims| claims.sub),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_fetch::MemoryTokenStorage;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_status_of_guest_session() {
        let credentials = CredentialStore::new(Arc::new(MemoryTokenStorage::new()));
        credentials.store_tokens("opaque", "opaque-refresh").await.unwrap();

        let status = token_status(&credentials, &ClientConfig::default()).await;

        assert!(!status.signed_in);
        assert!(status.access_token);
        assert!(status.refresh_token);
        assert_eq!(status.refresh_expiry, None);
        assert_eq!(status.subject, None);
        assert_eq!(status.backend, "file");
    }

    #[tokio::test]
    async fn test_status_when_empty() {
        let credentials = CredentialStore::new(Arc::new(MemoryTokenStorage::new()));
        let status = token_status(&credentials, &ClientConfig::default()).await;

        assert!(!status.access_token);
        assert!(!status.refresh_token);
    }
}
