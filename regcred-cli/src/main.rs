//! Docker credential helper for GCR-style registries.
//!
//! Implements the credential-helper protocol: one subcommand per operation,
//! the payload on stdin, the result as JSON on stdout. Everything else —
//! logs, reauthentication status, errors — goes to stderr so callers parsing
//! stdout are never confused.
//!
//! # Usage
//!
//! ```bash
//! # Resolve credentials for a registry (the URL arrives on stdin)
//! echo "https://gcr.io" | docker-credential-regcred get
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use regcred_core::{
    AdcDetector, CredentialHelper, Credentials, HelperConfig, LoginAgent, LoginError,
    RegistryHelper, SdkCommand, Secret, StoredAuth, create_store, load_config,
};

#[derive(Parser)]
#[command(name = "docker-credential-regcred")]
#[command(about = "Docker credential helper for GCR-style registries")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve credentials for the server URL given on stdin
    Get,

    /// Store credentials (unsupported; this helper is resolve-only)
    Store,

    /// Erase credentials (unsupported; this helper is resolve-only)
    Erase,

    /// List stored credentials (unsupported; this helper is resolve-only)
    List,

    /// Print the helper version
    Version,
}

/// Stdin payload for `store`.
#[derive(Deserialize)]
struct StorePayload {
    #[serde(rename = "Username")]
    username: String,
    #[serde(rename = "Secret")]
    secret: String,
}

/// Stdout payload for `get`.
#[derive(Serialize)]
struct GetPayload<'a> {
    #[serde(rename = "ServerURL")]
    server_url: &'a str,
    #[serde(rename = "Username")]
    username: &'a str,
    #[serde(rename = "Secret")]
    secret: &'a str,
}

/// Login agent for non-interactive wiring: the browser consent flow lives
/// outside this helper, so reauthentication is delegated to the SDK.
struct ManualLoginAgent;

#[async_trait]
impl LoginAgent for ManualLoginAgent {
    async fn perform_login(&self) -> Result<StoredAuth, LoginError> {
        Err(LoginError::Unavailable {
            message: "run `gcloud auth login` to re-authenticate, then retry".to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs must never land on stdout; the protocol owns that channel.
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Get => get().await,
        Commands::Store => store().await,
        Commands::Erase => erase().await,
        Commands::List => list().await,
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn build_helper(config: &HelperConfig) -> RegistryHelper {
    RegistryHelper::new(
        config,
        create_store(true),
        Arc::new(AdcDetector::new(config.token_endpoint.clone())),
        Arc::new(SdkCommand::new()),
        Arc::new(ManualLoginAgent),
    )
}

async fn get() -> Result<()> {
    let server_url = read_payload().await?;
    let config = load_config()?;
    tracing::debug!(sources = ?config.token_sources, "resolving registry credentials");
    let helper = build_helper(&config);

    let creds = helper.get(&server_url).await?;
    let payload = GetPayload {
        server_url: &server_url,
        username: &creds.username,
        secret: creds.secret.expose(),
    };
    println!("{}", serde_json::to_string(&payload)?);
    Ok(())
}

async fn store() -> Result<()> {
    let payload = read_payload().await?;
    let parsed: StorePayload =
        serde_json::from_str(&payload).context("malformed credentials payload on stdin")?;
    let config = load_config()?;
    let helper = build_helper(&config);

    let credentials = Credentials {
        username: parsed.username,
        secret: Secret::new(parsed.secret),
    };
    helper.add(&credentials).await?;
    Ok(())
}

async fn erase() -> Result<()> {
    let server_url = read_payload().await?;
    let config = load_config()?;
    let helper = build_helper(&config);

    helper.delete(&server_url).await?;
    Ok(())
}

async fn list() -> Result<()> {
    let config = load_config()?;
    let helper = build_helper(&config);

    let listing = helper.list().await?;
    println!("{}", serde_json::to_string(&listing)?);
    Ok(())
}

/// The protocol passes the operation's payload on stdin, newline-terminated.
async fn read_payload() -> Result<String> {
    let mut buffer = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buffer)
        .await
        .context("failed to read payload from stdin")?;
    Ok(buffer.trim().to_string())
}
