//! Scenario 1: Issue and Cancel
//!
//! Walk-through:
//!   1. The ledger starts and logs its lifecycle event
//!   2. Invoice FACT2024-001 is issued as the first record of the chain
//!   3. The invoice is cancelled; the cancellation chains onto the issuance
//!   4. A resubmission still linked to the issuance is refused as a broken link
//!   5. The chain is verified and the anomaly scanner reports no findings

use verichain_contracts::{
    error::{ChainError, LedgerError, LedgerResult},
    record::{Chaining, Record},
};

use crate::{
    build_ledger_with_clock, erp_config,
    fixtures::{self, example_cancellation, example_issuance},
};

use super::{short, submit_signed};

/// What the scenario observed.
#[derive(Debug)]
pub struct IssueAndCancelOutcome {
    pub issuance: Record,
    pub cancellation: Record,
    pub stale_rejected: bool,
    pub verified: bool,
    pub findings: usize,
}

/// Run Scenario 1: Issue and Cancel.
pub fn run_scenario() -> LedgerResult<IssueAndCancelOutcome> {
    println!("=== Scenario 1: Issue and Cancel ===");
    println!();

    let config = erp_config()?;
    let ledger =
        build_ledger_with_clock(&config, fixtures::simulated_clock(fixtures::utc(2024, 2, 14, 9, 0)));
    ledger.start()?;

    // ── Issuance ──────────────────────────────────────────────────────────────

    let issuance = submit_signed(&ledger, example_issuance().into())?;
    println!("  Issued:     {}", issuance.invoice());
    println!("  First:      {}", issuance.chaining().is_first);
    println!("  Fingerprint: {}...", short(issuance.fingerprint()));
    println!();

    // ── Cancellation ──────────────────────────────────────────────────────────

    let cancellation = submit_signed(&ledger, example_cancellation().into())?;
    println!("  Cancelled:  {}", cancellation.invoice());
    println!(
        "  Previous:   {}...",
        short(cancellation.chaining().previous_fingerprint().unwrap_or("-"))
    );
    println!("  Fingerprint: {}...", short(cancellation.fingerprint()));
    println!();

    // ── Stale resubmission ────────────────────────────────────────────────────

    // Linked to the issuance although the cancellation is now the tail.
    let mut stale: Record = example_cancellation().into();
    stale.set_chaining(Chaining::after(issuance.to_ref()));
    let stale_rejected = match ledger.submit(stale) {
        Err(LedgerError::Chain(ChainError::BrokenLink { .. })) => {
            println!("  Stale resubmission:     REJECTED (broken link)");
            true
        }
        Err(e) => return Err(e),
        Ok(_) => {
            println!("  Stale resubmission:     ACCEPTED");
            false
        }
    };

    // ── Audit ─────────────────────────────────────────────────────────────────

    let verified = ledger.verify().is_ok();
    let report = ledger.run_anomaly_scan()?;

    println!(
        "  Chain integrity:        {} ({} record(s))",
        if verified { "VERIFIED" } else { "FAILED" },
        ledger.snapshot().len()
    );
    println!("  Anomaly findings:       {}", report.record_findings.len());

    ledger.stop()?;
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(IssueAndCancelOutcome {
        issuance,
        cancellation,
        stale_rejected,
        verified,
        findings: report.record_findings.len() + report.event_findings.len(),
    })
}
