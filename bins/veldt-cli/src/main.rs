//! veldt-cli — Scenario runner and voting-power calculator for the
//! Veldt escrow ledger.
//!
//! Replays scripted lock schedules against a fresh in-memory ledger and
//! reports balances and supply at each probe point, or computes the
//! initial voting power of a hypothetical lock.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Args, Parser, Subcommand};
use veldt_core::constants::{MAX_LOCK_SECS, PERIOD_SECS, POWER_PRECISION};

use crate::scenario::{format_power, Report, Scenario};

/// Veldt command-line interface.
#[derive(Parser)]
#[command(name = "veldt-cli")]
#[command(version, about = "Commitment is power; power decays.")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json").
    #[arg(long, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted scenario and print the probe report.
    Simulate(SimulateArgs),
    /// Compute the initial voting power of a hypothetical lock.
    Power(PowerArgs),
}

#[derive(Args)]
struct SimulateArgs {
    /// Path to the scenario JSON file.
    scenario: PathBuf,

    /// Emit the report as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PowerArgs {
    /// Collateral amount in raw units.
    #[arg(long)]
    amount: u64,

    /// Lock duration in whole weeks.
    #[arg(long)]
    weeks: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Simulate(args) => simulate(args),
        Commands::Power(args) => power(args),
    }
}

fn simulate(args: SimulateArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.scenario.display()))?;
    let report = scenario::run(&scenario)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }
    Ok(())
}

fn print_table(report: &Report) {
    for row in &report.rows {
        let when = DateTime::from_timestamp(row.ts as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| row.ts.to_string());
        println!("-- {} (block {})", when, row.block);
        println!("   locked {:>14}  supply {:>14}", row.total_locked, format_power(row.total_supply));
        for (name, balance) in &row.balances {
            println!("   {name:<16} {:>14}", format_power(*balance));
        }
    }
    if report.rows.is_empty() {
        println!("no probe steps in scenario");
    }
}

fn power(args: PowerArgs) -> Result<()> {
    let duration = args
        .weeks
        .checked_mul(PERIOD_SECS)
        .context("lock duration overflows")?;
    anyhow::ensure!(duration <= MAX_LOCK_SECS, "duration exceeds the maximum lock length");

    let slope = args.amount as u128 * POWER_PRECISION as u128 / MAX_LOCK_SECS as u128;
    let initial = slope * duration as u128;
    println!(
        "amount {} locked {} weeks -> initial power {} (slope {}/s)",
        args.amount,
        args.weeks,
        format_power(initial.min(u64::MAX as u128) as u64),
        slope,
    );
    Ok(())
}

fn init_tracing(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
