//! `pagination-token`: issue and inspect continuation tokens from the shell.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging.
//! 3. Build the KMS client and the token codec.
//! 4. Run the requested subcommand.

mod config;
mod telemetry;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use pagination_token::codec::{AttributeCodec, StartKeyCodec};
use pagination_token::{KmsEncryptionService, PaginationTokenCodec};

#[derive(Debug, Parser)]
#[command(name = "pagination-token", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encode a start key (attribute JSON) into a token.
    Encode {
        /// File holding the start key; reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Decode a token and print its start key as attribute JSON.
    Decode {
        /// The token to decode.
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    telemetry::init_telemetry(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        ttl_secs = cfg.token_ttl_secs,
        charset = cfg.binary_charset.name(),
        "pagination-token starting"
    );

    let pipeline = cfg.pipeline_config()?;
    let documents = StartKeyCodec::new(AttributeCodec::new(pipeline.charset));
    let service = KmsEncryptionService::from_env(cfg.kms_endpoint_url.as_deref()).await;
    let codec = PaginationTokenCodec::with_config(service, pipeline)
        .context("invalid token pipeline configuration")?;

    match cli.command {
        Command::Encode { input } => {
            let text = read_input(input.as_deref())?;
            let start_key = documents
                .deserialize(&text)
                .context("input is not a valid start key document")?;
            let token = codec.encode(&start_key).await.context("failed to encode token")?;
            println!("{token}");
        }
        Command::Decode { token } => {
            let start_key = codec.decode(token.trim()).await.context("failed to decode token")?;
            let text = documents
                .serialize(&start_key)
                .context("failed to render start key")?;
            println!("{text}");
        }
    }

    Ok(())
}

fn read_input(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read start key from stdin")?;
            Ok(text)
        }
    }
}
