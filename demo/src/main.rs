//! VERICHAIN ERP Reference Runtime: Demo CLI
//!
//! Runs one or all of the three ledger demo scenarios, or checks a ledger
//! configuration file.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- issue-and-cancel
//!   cargo run -p demo -- tamper-detection
//!   cargo run -p demo -- period-export
//!   cargo run -p demo -- check-config path/to/ledger.toml

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use verichain_contracts::error::LedgerResult;
use verichain_core::LedgerConfig;
use verichain_ref_erp::scenarios::{issue_and_cancel, period_export, tamper_detection};

// ── CLI definition ────────────────────────────────────────────────────────────

/// VERICHAIN: hash-chained invoice record ledger demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "VERICHAIN ERP reference runtime demo",
    long_about = "Runs VERICHAIN demo scenarios showing record chaining, tamper\n\
                  detection, period export with purge, and event logging."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three ledger scenarios in sequence.
    RunAll,
    /// Scenario 1: Issue and Cancel (chaining and stale link refusal).
    IssueAndCancel,
    /// Scenario 2: Tamper Detection (edited backup, anomaly scan).
    TamperDetection,
    /// Scenario 3: Period Export (export, purge, continue from anchor).
    PeriodExport,
    /// Parse a ledger TOML file and print the resulting settings.
    CheckConfig {
        /// Path to the ledger configuration file.
        path: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::IssueAndCancel => run_issue_and_cancel(),
        Command::TamperDetection => run_tamper_detection(),
        Command::PeriodExport => run_period_export(),
        Command::CheckConfig { path } => check_config(&path),
    };

    match result {
        Ok(()) => {
            println!("All selected commands completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_all() -> LedgerResult<()> {
    run_issue_and_cancel()?;
    run_tamper_detection()?;
    run_period_export()?;
    Ok(())
}

fn run_issue_and_cancel() -> LedgerResult<()> {
    issue_and_cancel::run_scenario().map(|_| ())
}

fn run_tamper_detection() -> LedgerResult<()> {
    tamper_detection::run_scenario().map(|_| ())
}

fn run_period_export() -> LedgerResult<()> {
    period_export::run_scenario().map(|_| ())
}

fn check_config(path: &std::path::Path) -> LedgerResult<()> {
    let config = LedgerConfig::from_file(path)?;
    info!(path = %path.display(), "configuration checked");

    let detector = config.detector;
    println!("  Chain scope:    {}", config.chain.scope);
    println!(
        "  Obligor:        {} ({})",
        config.producer.obligor_name, config.producer.obligor_nif
    );
    println!("  System ID:      {}", config.producer.system_id);
    println!(
        "  Detector:       fingerprints={} signatures={} chain={} dates={} event_log={}",
        detector.fingerprints, detector.signatures, detector.chain, detector.dates, detector.event_log
    );
    println!();
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("VERICHAIN: Hash-Chained Invoice Record Ledger");
    println!("ERP Reference Demo");
    println!("=============================================");
    println!();
    println!("Per submitted record:");
    println!("  [1] Validator checks required fields, formats and lengths");
    println!("  [2] Chain checks the declared link against the current tail");
    println!("  [3] SHA-256 fingerprint over the canonical form, previous fingerprint included");
    println!("  [4] Record appended; events chained in their own log");
    println!();
}
