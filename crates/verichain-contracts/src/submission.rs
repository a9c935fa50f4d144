//! Submission envelope: a header naming the obligor and the records it
//! submits together.
//!
//! A batch carries between one and a thousand records.  Each record is still
//! validated and chained on its own; the header only states who submits them
//! and under which kind of submission.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::format;
use crate::record::{InvoiceId, Record};

/// A Spanish taxpayer identified by name and NIF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxpayer {
    pub name: String,
    pub nif: String,
}

impl Taxpayer {
    pub fn new(name: impl Into<String>, nif: impl Into<String>) -> Self {
        Self { name: name.into(), nif: nif.into() }
    }
}

/// A submission made on the obligor's own initiative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoluntarySubmission {
    /// Last day the system submits voluntarily, when it is leaving the scheme.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "format::date::option")]
    pub end_date: Option<NaiveDate>,
    /// The records are sent late because of a technical incident.
    #[serde(default)]
    pub incident: bool,
}

/// A submission answering a request from the tax administration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSubmission {
    pub reference: String,
    /// This batch is the last one answering `reference`.
    #[serde(default)]
    pub ends_requirement: bool,
}

/// Who submits a batch and why.
///
/// `voluntary` and `requirement` are alternatives; neither means an ordinary
/// submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionHeader {
    pub obligor: Taxpayer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative: Option<Taxpayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voluntary: Option<VoluntarySubmission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement: Option<RequirementSubmission>,
}

impl SubmissionHeader {
    /// An ordinary submission by `obligor` itself.
    pub fn for_obligor(obligor: Taxpayer) -> Self {
        Self {
            obligor,
            representative: None,
            voluntary: None,
            requirement: None,
        }
    }
}

/// A header and the records it covers, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionBatch {
    pub header: SubmissionHeader,
    pub records: Vec<Record>,
}

/// A record of a batch that was not appended.
#[derive(Debug)]
pub struct RejectedRecord {
    /// Zero-based position in the batch.
    pub position: usize,
    pub invoice: InvoiceId,
    pub error: LedgerError,
}

/// Per-record outcome of a batch submission.
#[derive(Debug, Default)]
pub struct BatchReceipt {
    /// Appended records with their fingerprints, in submission order.
    pub accepted: Vec<Record>,
    pub rejected: Vec<RejectedRecord>,
}

impl BatchReceipt {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}
