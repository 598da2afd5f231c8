#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays a Gridturn scenario headlessly.

mod audio;
mod scenario;
mod session;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scenario::Scenario;

/// Replays a scripted Gridturn session and reports the final state.
#[derive(Debug, Parser)]
#[command(name = "gridturn", version, about, long_about = None)]
struct Args {
    /// TOML scenario to replay; the built-in scenario is used when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Overrides the seed of the enemy policy.
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated milliseconds advanced per frame.
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
    frame_ms: u64,
    /// Prints the final summary as JSON.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Gridturn command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?,
        None => Scenario::builtin().context("built-in scenario is invalid")?,
    };
    let seed = args.seed.or(scenario.seed).unwrap_or_default();
    tracing::info!(seed, moves = scenario.moves.len(), "replaying scenario");

    let summary = session::run(&scenario, seed, Duration::from_millis(args.frame_ms));

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("failed to encode summary")?;
        println!("{json}");
    } else {
        println!("{summary}");
    }

    Ok(())
}
