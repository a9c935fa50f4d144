//! Scenario 3: Period Export
//!
//! Walk-through:
//!   1. Three January invoices are chained
//!   2. January is exported and its record bodies purged; the chain keeps an
//!      anchor of the last purged record
//!   3. February invoices chain onto the anchor and the chain still verifies
//!   4. Exporting January again finds nothing to export
//!   5. February is summarized and its event log range exported

use chrono::{DateTime, Duration, FixedOffset};
use rust_decimal::Decimal;

use verichain_contracts::{
    error::{ExportError, LedgerError, LedgerResult},
    export::{EventExportSummary, PeriodSummary, RecordExportSummary},
};
use verichain_core::Ledger;

use crate::{build_ledger_with_clock, erp_config, fixtures};

use super::{short, submit_signed};

#[derive(Debug)]
pub struct PeriodExportOutcome {
    pub january: RecordExportSummary,
    pub february: PeriodSummary,
    pub events: EventExportSummary,
    pub retained: usize,
    pub verified: bool,
    pub reexport_empty: bool,
}

/// `[first instant of month, last second of month]` in UTC.
fn month(year: i32, month: u32) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let from = fixtures::utc(year, month, 1, 0, 0);
    let next = if month == 12 {
        fixtures::utc(year + 1, 1, 1, 0, 0)
    } else {
        fixtures::utc(year, month + 1, 1, 0, 0)
    };
    (from, next - Duration::seconds(1))
}

fn chain_invoices(ledger: &Ledger, invoices: &[(&str, i64, DateTime<FixedOffset>)]) -> LedgerResult<()> {
    for (series, cents, generated_at) in invoices {
        let record = submit_signed(
            ledger,
            fixtures::invoice(series, Decimal::new(*cents, 2), *generated_at),
        )?;
        println!(
            "  Chained:    {} -> {}...",
            record.invoice(),
            short(record.chaining().previous_fingerprint().unwrap_or("first"))
        );
    }
    Ok(())
}

/// Run Scenario 3: Period Export.
pub fn run_scenario() -> LedgerResult<PeriodExportOutcome> {
    println!("=== Scenario 3: Period Export ===");
    println!();

    let config = erp_config()?;
    let ledger =
        build_ledger_with_clock(&config, fixtures::simulated_clock(fixtures::utc(2024, 2, 1, 9, 0)));
    ledger.start()?;

    // ── January ───────────────────────────────────────────────────────────────

    chain_invoices(
        &ledger,
        &[
            ("FACT2024-201", 50_000, fixtures::utc(2024, 1, 10, 9, 0)),
            ("FACT2024-202", 120_000, fixtures::utc(2024, 1, 15, 12, 30)),
            ("FACT2024-203", 8_000, fixtures::utc(2024, 1, 20, 17, 45)),
        ],
    )?;
    println!();

    let (jan_from, jan_to) = month(2024, 1);
    let january = ledger.export_records(jan_from, jan_to, true)?;
    println!(
        "  January exported:       {} issuance(s), gross {}",
        january.issuance_count, january.gross_total_sum
    );
    println!("  Anchor:                 {}", january.last.invoice);
    println!("  Bodies purged:          {}", january.purged);
    println!();

    // ── February ──────────────────────────────────────────────────────────────

    chain_invoices(
        &ledger,
        &[
            ("FACT2024-204", 30_000, fixtures::utc(2024, 2, 5, 10, 0)),
            ("FACT2024-205", 45_025, fixtures::utc(2024, 2, 9, 16, 15)),
        ],
    )?;

    let retained = ledger.snapshot().len();
    let verified = ledger.verify().is_ok();
    println!(
        "  Chain integrity:        {} ({} retained record(s))",
        if verified { "VERIFIED" } else { "FAILED" },
        retained
    );

    let reexport_empty = match ledger.export_records(jan_from, jan_to, true) {
        Err(LedgerError::Export(ExportError::EmptyRange { .. })) => true,
        Err(e) => return Err(e),
        Ok(_) => false,
    };
    println!(
        "  January re-export:      {}",
        if reexport_empty { "NOTHING TO EXPORT" } else { "EXPORTED AGAIN" }
    );
    println!();

    // ── Period summary ────────────────────────────────────────────────────────

    let (feb_from, feb_to) = month(2024, 2);
    let february = ledger.summarize_period(feb_from, feb_to)?;
    println!(
        "  February summary:       {} issuance(s), tax {}, gross {}",
        february.issuance_count, february.tax_total_sum, february.gross_total_sum
    );
    for count in &february.event_counts {
        println!("    event {}: {}", count.event_type, count.count);
    }

    let events = ledger.export_events(feb_from, feb_to)?;
    println!("  Events exported:        {}", events.event_count);

    ledger.stop()?;
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(PeriodExportOutcome {
        january,
        february,
        events,
        retained,
        verified,
        reexport_empty,
    })
}
