//! Control client (remplay-ctl)
//!
//! Sends commands to a running remplay-ap daemon.
//!
//! ```text
//! remplay-ctl next                      # one-shot
//! remplay-ctl "volume -0.1" pause       # one-shot, sent as "volume -0.1;pause"
//! remplay-ctl                           # interactive prompt
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use remplay_common::config::ConfigResolver;
use remplay_common::CommandClient;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for remplay-ctl
#[derive(Parser, Debug)]
#[command(name = "remplay-ctl")]
#[command(about = "Control client for the remplay audio player")]
#[command(version)]
struct Args {
    /// Configuration file used to find the daemon address
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Daemon address (ip:port), overrides the configuration
    #[arg(short, long)]
    address: Option<String>,

    /// Open an interactive prompt even when commands are given
    #[arg(short, long)]
    interactive: bool,

    /// Commands to send as one batch
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    commands: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let address = match args.address {
        Some(address) => address,
        None => ConfigResolver::new(args.config)
            .load()
            .context("Failed to load configuration")?
            .bind_address(),
    };

    let mut client = CommandClient::connect(&address)
        .await
        .with_context(|| format!("Could not reach remplay-ap at {}", address))?;

    if args.commands.is_empty() || args.interactive {
        if !args.commands.is_empty() {
            eprintln!("Ignoring {} command argument(s) in interactive mode", args.commands.len());
        }
        let input = BufReader::new(tokio::io::stdin());
        client
            .interactive(input, tokio::io::stdout())
            .await
            .context("Interactive session failed")?;
    } else {
        client
            .one_shot(&args.commands)
            .await
            .context("Failed to send commands")?;
    }

    Ok(())
}
