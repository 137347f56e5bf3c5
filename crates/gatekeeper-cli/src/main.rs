//! `mcp-gatekeeper` — policy-enforcing gateway for the Model Context
//! Protocol. Top-level orchestration: parse flags, initialize logging,
//! and dispatch into the gateway or bridge mode (spec §2 "Wiring &
//! signal handling").

mod bridge;
mod cli;
mod gateway;
mod logging;
mod plugins;
mod signal;

use clap::Parser;
use cli::{Cli, Mode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let stdio_mode = matches!(
        &cli.mode,
        Mode::Gateway(args) if args.transport == cli::GatewayTransport::Stdio
    );
    logging::init(&cli.log_level, cli.log_json, stdio_mode);

    let result = match cli.mode {
        Mode::Gateway(args) => gateway::run(args).await,
        Mode::Bridge(args) => bridge::run(args).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
    Ok(())
}
