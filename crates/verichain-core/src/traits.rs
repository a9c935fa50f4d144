//! Core trait definitions for the VERICHAIN ledger.
//!
//! These traits define the component boundaries:
//!
//! - `RecordValidator`: structural checks on a candidate record
//! - `RecordStore`: the append-only, hash-chained record sequence
//! - `EventSink`: the independent, hash-chained event log
//! - `AnomalyScanner`: re-scans snapshots of both chains
//! - `SignatureVerifier`: the external key/certificate store
//!
//! The `Ledger` wires them together in the correct order.

use chrono::{DateTime, FixedOffset};

use verichain_contracts::{
    anomaly::ScanReport,
    chain::{Anchor, ChainScope, ChainSnapshot, IntegrityFailure},
    error::{ChainError, ExportError, LogIntegrityError, PurgeError, ValidationError},
    event::{EventPayload, EventRecord, EventSnapshot},
    export::{EventExportSummary, RecordExportSummary},
    record::Record,
    submission::SubmissionBatch,
};

/// Checks the shape of a candidate record before it reaches the chain.
pub trait RecordValidator: Send + Sync {
    /// Return the first violation found in `record`.
    ///
    /// `prior` is the tail of the candidate's chaining scope, if any.  It is
    /// used only to check that a declared previous link names the right
    /// invoice; fingerprint and ordering checks belong to the store.
    fn validate(&self, record: &Record, prior: Option<&Anchor>) -> Result<(), ValidationError>;

    /// Check a batch's header and size, and that every record was issued by
    /// the header's obligor.  The records themselves are validated one by
    /// one as they are submitted.
    fn validate_batch(&self, batch: &SubmissionBatch) -> Result<(), ValidationError>;
}

/// The append-only record chain.
///
/// Implementations must make tail lookup and append atomic with respect to
/// each other, and must hand out snapshots taken under the same exclusion.
pub trait RecordStore: Send + Sync {
    /// How records are grouped into chains.
    fn scope(&self) -> ChainScope;

    /// Current tail of the chain `record` belongs to.
    fn tail_for(&self, record: &Record) -> Option<Anchor>;

    /// Link-check, fingerprint and append `candidate`.
    ///
    /// Returns the appended record with its fingerprint filled in.  On error
    /// the chain is unchanged.
    fn append(&self, candidate: Record) -> Result<Record, ChainError>;

    /// A consistent copy of the retained chain.
    fn snapshot(&self) -> ChainSnapshot;

    /// Recompute every fingerprint and link, reporting every failing position.
    fn verify(&self) -> Result<(), Vec<IntegrityFailure>>;

    /// Summarize the records generated within `[from, to]`.
    fn export_range(
        &self,
        from: &DateTime<FixedOffset>,
        to: &DateTime<FixedOffset>,
    ) -> Result<RecordExportSummary, ExportError>;

    /// Drop the bodies described by `summary`, keeping per-scope anchors.
    fn purge_exported(&self, summary: &RecordExportSummary) -> Result<(), PurgeError>;

    /// Replace the whole chain with `backup`, tails and anchors included.
    ///
    /// No integrity check is made; restored history is only trusted after an
    /// anomaly scan.
    fn restore(&self, backup: ChainSnapshot) -> Result<(), ChainError>;
}

/// The append-only event log.
pub trait EventSink: Send + Sync {
    /// Chain and append one event.  Fails only when the log itself is corrupt.
    fn log_event(
        &self,
        payload: EventPayload,
        other_data: Option<String>,
    ) -> Result<EventRecord, LogIntegrityError>;

    /// Re-verify the tail without appending.  A corrupt log halts exactly
    /// as it would on `log_event`.
    fn check_integrity(&self) -> Result<(), LogIntegrityError>;

    /// A consistent copy of the log.
    fn snapshot(&self) -> EventSnapshot;

    /// Summarize the events generated within `[from, to]`.
    fn export_range(
        &self,
        from: &DateTime<FixedOffset>,
        to: &DateTime<FixedOffset>,
    ) -> Result<EventExportSummary, ExportError>;

    /// Replace the log with `backup` and lift a halt.  The restored tail is
    /// re-verified by the next `log_event`.
    fn restore(&self, backup: EventSnapshot) -> Result<(), LogIntegrityError>;
}

/// Outcome of one signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Invalid { reason: String },
    /// The key store holds no key for the declared signer.
    UnknownSigner,
}

/// The external key/certificate store.
pub trait SignatureVerifier: Send + Sync {
    /// Verify `signature` over `message` with the key registered for `signer`.
    fn verify(&self, signer: &str, message: &[u8], signature: &str) -> SignatureCheck;
}

/// Scans chain snapshots for integrity and ordering breaks.
///
/// Scanners are pure over their inputs: they never write to the event log.
/// The `Ledger` logs their findings.
pub trait AnomalyScanner: Send + Sync {
    fn scan(&self, records: &ChainSnapshot, events: &EventSnapshot) -> ScanReport;
}
