//! stakelock-cli — Operator tooling for the Stakelock staking ledger.
//!
//! Previews accrual figures, prints the effective engine configuration,
//! and replays JSON scenarios against an in-memory or RocksDB-backed platform.

mod scenario;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use stakelock_accrual::AccrualEngine;
use stakelock_core::config::EngineConfig;
use stakelock_core::constants::{SECONDS_PER_DAY, UNIT};
use stakelock_core::traits::AccrualCalculator;
use stakelock_core::types::{Amount, Timestamp};
use stakelock_platform::{
    ManualClock, MemoryCustody, MemoryPlatform, RocksLedger, Settings, StakingPlatform,
};

use crate::scenario::{Outcome, Scenario, StepReport};

/// Stakelock command-line interface.
#[derive(Parser)]
#[command(name = "stakelock-cli")]
#[command(version, about = "Time-locked staking ledger tooling")]
struct Cli {
    /// Settings file (TOML); STAKELOCK_* environment variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides settings.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format ("text" or "json"). Overrides settings.
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the reward a stake would accrue over a period.
    Preview(PreviewArgs),
    /// Print the effective engine configuration as JSON.
    Config,
    /// Replay a JSON scenario against a fresh platform.
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct PreviewArgs {
    /// Principal in whole tokens.
    #[arg(short, long)]
    principal: u64,

    /// Whole days staked.
    #[arg(short, long, default_value_t = 1)]
    days: u64,

    /// Additional seconds on top of `--days`.
    #[arg(short, long, default_value_t = 0)]
    secs: u64,

    /// Daily rate in parts per billion. Defaults to the configured rate.
    #[arg(long)]
    rate_ppb: Option<u64>,
}

#[derive(Args)]
struct SimulateArgs {
    /// Scenario file (JSON).
    scenario: PathBuf,

    /// Persist the ledger in RocksDB under this directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Persist the ledger under the configured data directory.
    #[arg(long, conflicts_with = "data_dir")]
    persist: bool,

    /// Emit step reports as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let level = cli.log_level.as_deref().unwrap_or(&settings.log_level);
    let format = cli.log_format.as_deref().unwrap_or(&settings.log_format);
    init_logging(level, format);

    let config = settings
        .engine_config()
        .context("Invalid engine settings")?;

    match cli.command {
        Commands::Preview(args) => preview(&config, args),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Simulate(args) => {
            let data_dir = args
                .data_dir
                .clone()
                .or_else(|| args.persist.then(|| settings.data_dir.clone()));
            simulate(config, data_dir.as_deref(), args)
        }
    }
}

/// Print the reward for a hypothetical stake.
fn preview(config: &EngineConfig, args: PreviewArgs) -> Result<()> {
    let rate = args.rate_ppb.unwrap_or(config.daily_rate_ppb);
    let elapsed = args
        .days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|s| s.checked_add(args.secs))
        .context("Period overflows")?;
    let principal = args.principal as Amount * UNIT;

    let reward = AccrualEngine::new(rate).earned(principal, elapsed)?;

    println!("Principal:  {} {}", format_amount(principal), config.stake_asset);
    println!("Elapsed:    {elapsed}s ({:.4} days)", elapsed as f64 / SECONDS_PER_DAY as f64);
    println!("Daily rate: {rate} ppb");
    println!("Reward:     {} {}", format_amount(reward), config.reward_asset);
    Ok(())
}

/// Replay a scenario file and print one line per step.
fn simulate(config: EngineConfig, data_dir: Option<&Path>, args: SimulateArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("Failed to read scenario: {}", args.scenario.display()))?;
    let scenario = Scenario::from_json(&text)?;
    let clock = Arc::new(ManualClock::new(scenario.start));

    let reports = match data_dir {
        Some(dir) => {
            let ledger = open_ledger(dir)?;
            let custody = MemoryCustody::for_ledger(&config, &ledger)?;
            let platform = StakingPlatform::new(config, ledger, custody, clock.clone())?;
            let reports = scenario::replay(&platform, &clock, &scenario)?;
            info!(
                accounts = platform.account_count()?,
                total = %format_amount(platform.total_staked()?),
                "ledger persisted"
            );
            reports
        }
        None => {
            let platform = MemoryPlatform::in_memory(config, clock.clone())?;
            scenario::replay(&platform, &clock, &scenario)?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", render_report(report));
        }
    }
    Ok(())
}

fn open_ledger(dir: &Path) -> Result<RocksLedger> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let path = dir.join("ledger");
    info!(path = %path.display(), "opening ledger");
    RocksLedger::open(&path).with_context(|| format!("Failed to open ledger: {}", path.display()))
}

fn render_report(report: &StepReport) -> String {
    let head = format!("{} {}", format_timestamp(report.at), report.account);
    match &report.outcome {
        Outcome::Deposited(r) => format!(
            "{head} deposited {} (principal {}, settled reward {}, unlocks {})",
            format_amount(r.amount),
            format_amount(r.principal),
            format_amount(r.settled_reward),
            format_timestamp(r.unlocks_at),
        ),
        Outcome::Withdrawn(r) => format!(
            "{head} withdrew {} principal + {} reward",
            format_amount(r.principal),
            format_amount(r.reward),
        ),
        Outcome::Queried { stake, pending_reward, state } => format!(
            "{head} stake {} pending {} [{state}]",
            format_amount(*stake),
            format_amount(*pending_reward),
        ),
        Outcome::Rejected { error } => format!("{head} rejected: {error}"),
    }
}

/// Render base units as a decimal token amount without trailing zeros.
fn format_amount(amount: Amount) -> String {
    let whole = amount / UNIT;
    let frac = amount % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:018}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

fn format_timestamp(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("@{ts}"))
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text. Logs go to stderr so reports stay on stdout.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_whole_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(50 * UNIT), "50");
    }

    #[test]
    fn format_fractional_amount() {
        assert_eq!(format_amount(10 * UNIT + UNIT / 2), "10.5");
        assert_eq!(format_amount(1), "0.000000000000000001");
    }

    #[test]
    fn format_epoch() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(86_400), "1970-01-02 00:00:00 UTC");
    }

    #[test]
    fn out_of_range_timestamp_falls_back() {
        assert_eq!(format_timestamp(u64::MAX), format!("@{}", u64::MAX));
    }

    #[test]
    fn cli_parses_simulate() {
        let cli = Cli::try_parse_from([
            "stakelock-cli",
            "simulate",
            "run.json",
            "--data-dir",
            "/tmp/x",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.scenario, PathBuf::from("run.json"));
                assert!(args.json);
                assert!(args.data_dir.is_some());
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn cli_parses_preview_defaults() {
        let cli = Cli::try_parse_from(["stakelock-cli", "preview", "--principal", "10"]).unwrap();
        match cli.command {
            Commands::Preview(args) => {
                assert_eq!(args.principal, 10);
                assert_eq!(args.days, 1);
                assert_eq!(args.secs, 0);
                assert!(args.rate_ppb.is_none());
            }
            _ => panic!("expected preview"),
        }
    }

    fn replay_on_disk(dir: &Path, json: &str) -> Vec<StepReport> {
        let scenario = Scenario::from_json(json).unwrap();
        let config = EngineConfig::default();
        let clock = Arc::new(ManualClock::new(scenario.start));
        let ledger = open_ledger(dir).unwrap();
        let custody = MemoryCustody::for_ledger(&config, &ledger).unwrap();
        let platform = StakingPlatform::new(config, ledger, custody, clock.clone()).unwrap();
        scenario::replay(&platform, &clock, &scenario).unwrap()
    }

    #[test]
    fn persisted_stake_withdrawable_on_later_run() {
        let dir = tempfile::tempdir().unwrap();
        let deposit = r#"{
            "start": 1000,
            "accounts": { "0x2222222222222222222222222222222222222222": { "balance_units": 20 } },
            "steps": [
                { "at": 0, "op": "deposit", "account": "0x2222222222222222222222222222222222222222", "amount_units": 5 }
            ]
        }"#;
        let withdraw = r#"{
            "start": 1000,
            "steps": [
                { "at": 7776000, "op": "withdraw", "account": "0x2222222222222222222222222222222222222222" }
            ]
        }"#;

        let first = replay_on_disk(dir.path(), deposit);
        assert!(matches!(first[0].outcome, Outcome::Deposited(_)));

        let second = replay_on_disk(dir.path(), withdraw);
        match &second[0].outcome {
            Outcome::Withdrawn(r) => {
                assert_eq!(r.principal, 5 * UNIT);
                assert_eq!(r.reward, 450 * UNIT);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let ledger = open_ledger(dir.path()).unwrap();
        assert_eq!(stakelock_core::ledger::LedgerStore::total_staked(&ledger).unwrap(), 0);
    }
}
