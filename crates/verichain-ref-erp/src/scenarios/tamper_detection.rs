//! Scenario 2: Tamper Detection
//!
//! Walk-through:
//!   1. Five signed invoices are chained
//!   2. A backup is taken and the gross total of the third invoice is edited
//!      in it, leaving its stored fingerprint untouched
//!   3. The edited backup is restored; the restore itself is logged
//!   4. Verification fails and the anomaly scanner reports a fingerprint
//!      finding naming exactly the edited invoice

use rust_decimal::Decimal;

use verichain_contracts::{
    anomaly::ScanReport,
    codes::AnomalyType,
    error::LedgerResult,
    record::{InvoiceId, Record},
};

use crate::{build_ledger_with_clock, erp_config, fixtures};

use super::submit_signed;

/// Number of invoices chained before the backup is taken.
const INVOICES: usize = 5;
/// Zero-based position of the edited invoice.
const EDITED: usize = 2;

#[derive(Debug)]
pub struct TamperOutcome {
    pub edited: InvoiceId,
    pub failures: usize,
    pub report: ScanReport,
}

/// Run Scenario 2: Tamper Detection.
pub fn run_scenario() -> LedgerResult<TamperOutcome> {
    println!("=== Scenario 2: Tamper Detection ===");
    println!();

    let config = erp_config()?;
    let ledger =
        build_ledger_with_clock(&config, fixtures::simulated_clock(fixtures::utc(2024, 3, 1, 8, 0)));
    ledger.start()?;

    // ── Build the chain ───────────────────────────────────────────────────────

    for n in 1..=INVOICES {
        let generated_at = fixtures::utc(2024, 3, 1, 9, n as u32);
        let base = Decimal::new(10_000 * n as i64, 2);
        let record = submit_signed(
            &ledger,
            fixtures::invoice(&format!("FACT2024-1{:02}", n), base, generated_at),
        )?;
        println!("  Chained:    {}", record.invoice());
    }
    println!();

    // ── Edit the backup ───────────────────────────────────────────────────────

    let mut backup = ledger.snapshot();
    let edited = backup.records[EDITED].invoice().clone();
    if let Record::Issuance(r) = &mut backup.records[EDITED] {
        r.gross_total += Decimal::new(10_000, 2);
    }
    println!("  Edited in backup:       {} (gross total +100.00)", edited);

    ledger.restore_backup(backup, None)?;
    println!("  Backup restored:        logged");
    println!();

    // ── Audit ─────────────────────────────────────────────────────────────────

    let failures = match ledger.verify() {
        Ok(()) => 0,
        Err(failures) => failures.len(),
    };
    println!("  Chain verification:     {} failure(s)", failures);

    let report = ledger.run_anomaly_scan()?;
    for finding in &report.record_findings {
        println!(
            "  Finding {} ({}):  {}",
            finding.anomaly,
            finding
                .record
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string()),
            finding.detail
        );
    }

    let pinpointed = report
        .record_findings_of(AnomalyType::FingerprintIntegrity)
        .filter(|f| f.record.as_ref() == Some(&edited))
        .count();
    println!(
        "  Edited invoice:         {}",
        if pinpointed == 1 { "PINPOINTED" } else { "MISSED" }
    );

    ledger.stop()?;
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(TamperOutcome { edited, failures, report })
}
