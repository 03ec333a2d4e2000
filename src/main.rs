//! Estate coordinator (v1)
//!
//! Server-side coordinator for a tokenized real-estate platform.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────────┐
//!                    │                  ESTATE COORDINATOR                       │
//!                    │                                                           │
//!   HTTP request     │  ┌────────┐   ┌──────────────┐   ┌───────────────┐       │
//!   ─────────────────┼─▶│  http  │──▶│ properties / │──▶│  blockchain   │───────┼──▶ EVM RPC
//!                    │  │ + auth │   │ upload_reqs /│   │ (signer, nonce│       │
//!                    │  └────────┘   │ submitters   │   │  write lock)  │       │
//!                    │               └──────┬───────┘   └───────┬───────┘       │
//!                    │                      │                   │ events        │
//!                    │               ┌──────▼───────┐   ┌───────▼───────┐       │
//!                    │               │   pinning    │   │   ingestor    │       │
//!                    │               └──────┬───────┘   └───────┬───────┘       │
//!                    │                      │                   │               │
//!                    │               ┌──────▼───────────────────▼───────┐       │
//!                    │               │         mirror (Postgres)        │       │
//!                    │               └──────────────────────────────────┘       │
//!                    │                                                           │
//!                    │   config · observability · lifecycle · resilience        │
//!                    └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use estate_coordinator::lifecycle::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "estate-coordinator", version, about = "Tokenized real-estate coordinator")]
struct Args {
    /// TOML configuration file. Secrets may come from the environment instead.
    #[arg(short, long, env = "ESTATE_CONFIG")]
    config: Option<PathBuf>,

    /// Do not apply database migrations at startup.
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    lifecycle::run(StartupOptions {
        config_path: args.config,
        skip_migrations: args.skip_migrations,
    })
    .await?;

    Ok(())
}
