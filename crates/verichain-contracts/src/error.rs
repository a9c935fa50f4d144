//! Error types for the VERICHAIN ledger.
//!
//! Each component has its own error enum; `LedgerError` wraps them for the
//! orchestration layer.  Anomaly findings are not errors and never appear here.

use thiserror::Error;

use crate::export::RecordExportSummary;

/// A candidate record is malformed.  The caller fixes the input and retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required field '{field}' is missing or empty")]
    MissingField { field: String },

    #[error("field '{field}' is {actual} characters long, maximum is {max}")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("field '{field}' has {actual} entries, expected {min}..={max}")]
    Cardinality {
        field: String,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("field '{field}' value {value} exceeds {integer_digits} integer / {fraction_digits} fraction digits")]
    Precision {
        field: String,
        value: String,
        integer_digits: u32,
        fraction_digits: u32,
    },

    #[error("field '{field}' is malformed: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("chaining block is malformed: {reason}")]
    MalformedChaining { reason: String },

    #[error("previous link names {declared} but the prior record is {prior}")]
    PreviousMismatch { declared: String, prior: String },

    #[error("inconsistent record: {reason}")]
    Inconsistent { reason: String },
}

/// An append was rejected.  The chain is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error(
        "broken link for {invoice}: chain tail is {}, candidate declares {}",
        expected.as_deref().unwrap_or("<empty>"),
        declared.as_deref().unwrap_or("<first>")
    )]
    BrokenLink {
        invoice: String,
        expected: Option<String>,
        declared: Option<String>,
    },

    #[error("out of order append for {invoice}: generated at {candidate_at}, chain tail at {tail_at}")]
    OutOfOrder {
        invoice: String,
        tail_at: String,
        candidate_at: String,
    },

    #[error("backup was taken under the {backup} chaining scope, the store chains {store}")]
    ScopeMismatch { backup: String, store: String },

    #[error("record chain unavailable: {reason}")]
    Unavailable { reason: String },
}

/// A purge was rejected.  No record body was removed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurgeError {
    #[error("purge would lose the chain anchor {anchor}: {reason}")]
    AnchorLoss { anchor: String, reason: String },

    #[error("export summary does not describe the retained records: {reason}")]
    SummaryMismatch { reason: String },

    #[error("exported range is not the oldest retained history: {retained} precedes it")]
    NotPrefix { retained: String },

    #[error("record chain unavailable: {reason}")]
    Unavailable { reason: String },
}

/// An export could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("no entries generated between {from} and {to}")]
    EmptyRange { from: String, to: String },

    #[error("export source unavailable: {reason}")]
    Unavailable { reason: String },
}

/// The event log is corrupt.  Fatal: the log halts and refuses further
/// entries until an operator intervenes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event log integrity failure: {reason}")]
pub struct LogIntegrityError {
    pub reason: String,
}

/// The unified error type for ledger orchestration.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Purge(#[from] PurgeError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    LogIntegrity(#[from] LogIntegrityError),

    /// Bodies were purged but the export event could not be logged.  The
    /// summary is the only remaining description of the purged range.
    #[error("records purged but the export was not logged: {source}")]
    UnloggedPurge {
        summary: Box<RecordExportSummary>,
        source: LogIntegrityError,
    },

    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the VERICHAIN crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
