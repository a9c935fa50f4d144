//! Anomaly detection types: checks, per-check statistics, findings, and the
//! detector configuration.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codes::AnomalyType;
use crate::record::InvoiceId;

/// One of the four independent integrity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityCheck {
    Fingerprint,
    Signature,
    ChainTraceability,
    DateTraceability,
}

impl fmt::Display for IntegrityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntegrityCheck::Fingerprint => "fingerprint",
            IntegrityCheck::Signature => "signature",
            IntegrityCheck::ChainTraceability => "chain-traceability",
            IntegrityCheck::DateTraceability => "date-traceability",
        };
        f.write_str(s)
    }
}

/// Whether a check ran and how many entries it examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckStats {
    pub performed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<u64>,
}

impl CheckStats {
    pub fn skipped() -> Self {
        Self { performed: false, processed: None }
    }

    pub fn ran(processed: u64) -> Self {
        Self { performed: true, processed: Some(processed) }
    }
}

/// Statistics of one scan launch, one entry per check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanStats {
    pub fingerprints: CheckStats,
    pub signatures: CheckStats,
    pub chain: CheckStats,
    pub dates: CheckStats,
}

/// A single detector finding.  Findings are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyFinding {
    pub anomaly: AnomalyType,
    pub check: IntegrityCheck,
    /// Identity of the offending invoice record, when the finding is about one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<InvoiceId>,
    /// Free-text detail, at most [`AnomalyFinding::DETAIL_MAX`] characters.
    pub detail: String,
}

impl AnomalyFinding {
    pub const DETAIL_MAX: usize = 100;

    pub fn new(
        anomaly: AnomalyType,
        check: IntegrityCheck,
        record: Option<InvoiceId>,
        detail: impl Into<String>,
    ) -> Self {
        let mut detail: String = detail.into();
        if detail.chars().count() > Self::DETAIL_MAX {
            detail = detail.chars().take(Self::DETAIL_MAX).collect();
        }
        Self { anomaly, check, record, detail }
    }
}

/// Which checks a scan runs.
///
/// Example in TOML:
/// ```toml
/// [detector]
/// fingerprints = true
/// signatures = false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub fingerprints: bool,
    pub signatures: bool,
    pub chain: bool,
    pub dates: bool,
    /// Also scan the event log itself.
    pub event_log: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            fingerprints: true,
            signatures: true,
            chain: true,
            dates: true,
            event_log: true,
        }
    }
}

/// Everything one detector run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub records: ScanStats,
    pub record_findings: Vec<AnomalyFinding>,
    /// `None` when the event log scan is disabled.
    pub events: Option<ScanStats>,
    pub event_findings: Vec<AnomalyFinding>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.record_findings.is_empty() && self.event_findings.is_empty()
    }

    /// Record findings of the given anomaly type.
    pub fn record_findings_of(&self, anomaly: AnomalyType) -> impl Iterator<Item = &AnomalyFinding> {
        self.record_findings.iter().filter(move |f| f.anomaly == anomaly)
    }
}
