//! The VERICHAIN ledger: orchestration of validation, chaining, anomaly
//! scanning and period export.
//!
//! The ledger enforces the write path:
//!
//!   Candidate → Validate → Append (link check + fingerprint) → Record
//!
//! and the monitoring path:
//!
//!   Snapshot records → Snapshot events → Scan → Log launch → Log findings
//!
//! The record store and the event log are separate serialization domains.
//! The ledger never holds both at once; a scan snapshots the record chain
//! before touching the event log so findings never reference appends that
//! happened mid-scan.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, error, info, warn};

use verichain_contracts::{
    anomaly::ScanReport,
    chain::{ChainSnapshot, IntegrityFailure},
    codes::EventType,
    error::{LedgerError, LedgerResult, LogIntegrityError},
    event::{EventPayload, EventRecord, EventSnapshot},
    export::{EventExportSummary, EventTypeCount, PeriodSummary, RecordExportSummary, RecordTotals},
    record::{Chaining, Record},
    submission::{BatchReceipt, RejectedRecord, SubmissionBatch},
};

use crate::traits::{AnomalyScanner, EventSink, RecordStore, RecordValidator};

/// The central ledger that owns one record chain and one event log.
pub struct Ledger {
    validator: Box<dyn RecordValidator>,
    store: Box<dyn RecordStore>,
    events: Box<dyn EventSink>,
    scanner: Box<dyn AnomalyScanner>,
}

impl Ledger {
    /// Create a new ledger from its components.
    pub fn new(
        validator: Box<dyn RecordValidator>,
        store: Box<dyn RecordStore>,
        events: Box<dyn EventSink>,
        scanner: Box<dyn AnomalyScanner>,
    ) -> Self {
        Self { validator, store, events, scanner }
    }

    /// Log the lifecycle start event.
    pub fn start(&self) -> LedgerResult<EventRecord> {
        let event = self.events.log_event(EventPayload::LifecycleStart, None)?;
        info!(fingerprint = %event.fingerprint, "ledger started");
        Ok(event)
    }

    /// Log the lifecycle stop event.
    pub fn stop(&self) -> LedgerResult<EventRecord> {
        let event = self.events.log_event(EventPayload::LifecycleStop, None)?;
        info!(fingerprint = %event.fingerprint, "ledger stopped");
        Ok(event)
    }

    /// Append an arbitrary event, e.g. `BackupRestored` or `Other`.
    pub fn log_event(
        &self,
        payload: EventPayload,
        other_data: Option<String>,
    ) -> LedgerResult<EventRecord> {
        Ok(self.events.log_event(payload, other_data)?)
    }

    /// Validate and append a candidate whose chaining block is already set.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed candidates, `Chain` for link or ordering
    /// violations.  In both cases nothing is appended.
    pub fn submit(&self, candidate: Record) -> LedgerResult<Record> {
        let invoice = candidate.invoice().to_string();
        let kind = candidate.kind();

        debug!(invoice = %invoice, kind = %kind, "record submitted");

        let prior = self.store.tail_for(&candidate);
        if let Err(e) = self.validator.validate(&candidate, prior.as_ref()) {
            warn!(invoice = %invoice, kind = %kind, error = %e, "record rejected by validation");
            return Err(e.into());
        }

        match self.store.append(candidate) {
            Ok(record) => {
                info!(
                    invoice = %invoice,
                    kind = %kind,
                    fingerprint = %record.fingerprint(),
                    "record appended"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(invoice = %invoice, kind = %kind, error = %e, "record rejected by chain");
                Err(e.into())
            }
        }
    }

    /// Link `candidate` to the current tail of its scope, then submit it.
    ///
    /// The tail is read and the append is attempted separately, so a
    /// concurrent appender may win the race; the resulting `BrokenLink` is
    /// returned and the caller decides whether to retry.
    pub fn submit_linked(&self, mut candidate: Record) -> LedgerResult<Record> {
        self.link(&mut candidate);
        self.submit(candidate)
    }

    /// Validate `batch` as a whole, then submit its records in order.
    ///
    /// Unsigned records are linked to the tail of their scope first.  A
    /// signed record keeps the chaining block its signature covers, so its
    /// producer must have linked it in batch order.  A record that fails does
    /// not stop the ones after it; the receipt says which were appended.
    ///
    /// # Errors
    ///
    /// `Validation` when the header or the batch size is wrong, or a record
    /// belongs to another obligor.  Nothing is appended then.
    pub fn submit_batch(&self, batch: SubmissionBatch) -> LedgerResult<BatchReceipt> {
        let obligor = batch.header.obligor.nif.clone();

        if let Err(e) = self.validator.validate_batch(&batch) {
            warn!(
                obligor = %obligor,
                records = batch.records.len(),
                error = %e,
                "batch rejected by validation"
            );
            return Err(e.into());
        }

        let mut receipt = BatchReceipt::default();
        for (position, candidate) in batch.records.into_iter().enumerate() {
            let invoice = candidate.invoice().clone();
            let result = if candidate.signature().is_some() {
                self.submit(candidate)
            } else {
                self.submit_linked(candidate)
            };
            match result {
                Ok(record) => receipt.accepted.push(record),
                Err(error) => receipt.rejected.push(RejectedRecord { position, invoice, error }),
            }
        }

        info!(
            obligor = %obligor,
            accepted = receipt.accepted.len(),
            rejected = receipt.rejected.len(),
            "batch submitted"
        );
        Ok(receipt)
    }

    /// Set `candidate`'s chaining block from the current tail of its scope.
    ///
    /// Callers that sign records link first, sign, then `submit`: the
    /// signature covers the previous fingerprint.
    pub fn link(&self, candidate: &mut Record) {
        let chaining = match self.store.tail_for(candidate) {
            Some(tail) => Chaining::after(tail.link),
            None => Chaining::first(),
        };
        candidate.set_chaining(chaining);
    }

    /// A consistent copy of the record chain.
    pub fn snapshot(&self) -> ChainSnapshot {
        self.store.snapshot()
    }

    /// Load a backup of the record chain and, optionally, of the event log,
    /// then log the restore.
    ///
    /// The event log is restored first so the `BackupRestored` entry chains
    /// onto the restored tail; a corrupt event backup surfaces here as
    /// `LogIntegrity`.
    pub fn restore_backup(
        &self,
        records: ChainSnapshot,
        events: Option<EventSnapshot>,
    ) -> LedgerResult<EventRecord> {
        let record_count = records.len();
        let event_count = events.as_ref().map(EventSnapshot::len);

        if let Some(events) = events {
            self.events.restore(events)?;
        }
        self.store.restore(records)?;

        let event = self.events.log_event(
            EventPayload::BackupRestored,
            Some(format!("{} records restored", record_count)),
        )?;
        warn!(records = record_count, events = ?event_count, "backup restored");
        Ok(event)
    }

    /// Full recomputation of the record chain, for audit.
    pub fn verify(&self) -> Result<(), Vec<IntegrityFailure>> {
        self.store.verify()
    }

    /// Run the anomaly scanner and log its launch and findings.
    ///
    /// # Errors
    ///
    /// Only `LogIntegrity`: findings are data and are returned in the report.
    pub fn run_anomaly_scan(&self) -> LedgerResult<ScanReport> {
        let records = self.store.snapshot();
        let events = self.events.snapshot();

        let report = self.scanner.scan(&records, &events);

        info!(
            scan_id = %report.scan_id,
            records = records.len(),
            events = events.len(),
            record_findings = report.record_findings.len(),
            event_findings = report.event_findings.len(),
            "anomaly scan complete"
        );

        if let Err(e) = self.log_scan(&report) {
            error!(
                scan_id = %report.scan_id,
                error = %e,
                "could not log anomaly scan results"
            );
            return Err(e.into());
        }

        Ok(report)
    }

    fn log_scan(&self, report: &ScanReport) -> Result<(), LogIntegrityError> {
        let scan_tag = Some(format!("scan {}", report.scan_id));

        self.events
            .log_event(EventPayload::RecordScanLaunched(report.records), scan_tag.clone())?;
        for finding in &report.record_findings {
            warn!(
                anomaly = %finding.anomaly,
                check = %finding.check,
                detail = %finding.detail,
                "record anomaly detected"
            );
            self.events
                .log_event(EventPayload::RecordAnomaly(finding.clone()), scan_tag.clone())?;
        }

        if let Some(stats) = report.events {
            self.events
                .log_event(EventPayload::EventScanLaunched(stats), scan_tag.clone())?;
            for finding in &report.event_findings {
                warn!(
                    anomaly = %finding.anomaly,
                    check = %finding.check,
                    detail = %finding.detail,
                    "event log anomaly detected"
                );
                self.events
                    .log_event(EventPayload::EventAnomaly(finding.clone()), scan_tag.clone())?;
            }
        }

        Ok(())
    }

    /// Export the records generated within `[from, to]`, optionally purging
    /// their bodies, and log the export.
    ///
    /// # Errors
    ///
    /// A purge is refused with `LogIntegrity` when the event log is halted.
    /// If the log fails after the bodies are gone, `UnloggedPurge` carries
    /// the summary.
    pub fn export_records(
        &self,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
        purge: bool,
    ) -> LedgerResult<RecordExportSummary> {
        let mut summary = self.store.export_range(&from, &to)?;

        if purge {
            // Bodies are only removed while the log can still record it.
            self.events.check_integrity()?;
            self.store.purge_exported(&summary)?;
            summary.purged = true;
        }

        if let Err(e) = self
            .events
            .log_event(EventPayload::RecordsExported(summary.clone()), None)
        {
            if !summary.purged {
                return Err(e.into());
            }
            error!(
                last = %summary.last.fingerprint,
                error = %e,
                "records purged but the export could not be logged"
            );
            return Err(LedgerError::UnloggedPurge { summary: Box::new(summary), source: e });
        }

        info!(
            issuances = summary.issuance_count,
            cancellations = summary.cancellation_count,
            last = %summary.last.fingerprint,
            purged = summary.purged,
            "records exported"
        );
        Ok(summary)
    }

    /// Export the events generated within `[from, to]` and log the export.
    pub fn export_events(
        &self,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> LedgerResult<EventExportSummary> {
        let summary = self.events.export_range(&from, &to)?;
        self.events
            .log_event(EventPayload::EventsExported(summary.clone()), None)?;

        info!(events = summary.event_count, "events exported");
        Ok(summary)
    }

    /// Build and log the periodic summary of `[from, to]`.
    pub fn summarize_period(
        &self,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> LedgerResult<PeriodSummary> {
        let records = self.store.snapshot();
        let events = self.events.snapshot();

        let totals: RecordTotals = records.between(&from, &to).collect();

        let mut counts: BTreeMap<EventType, u64> = BTreeMap::new();
        for event in events.between(&from, &to) {
            *counts.entry(event.event_type).or_default() += 1;
        }

        let summary = PeriodSummary {
            from,
            to,
            event_counts: counts
                .into_iter()
                .map(|(event_type, count)| EventTypeCount { event_type, count })
                .collect(),
            first_record: totals.first,
            last_record: totals.last,
            issuance_count: totals.issuance_count,
            tax_total_sum: totals.tax_total_sum,
            gross_total_sum: totals.gross_total_sum,
            cancellation_count: totals.cancellation_count,
        };

        self.events
            .log_event(EventPayload::PeriodSummary(summary.clone()), None)?;
        info!(
            issuances = summary.issuance_count,
            cancellations = summary.cancellation_count,
            event_types = summary.event_counts.len(),
            "period summary logged"
        );
        Ok(summary)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
