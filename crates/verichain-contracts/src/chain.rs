//! Chain bookkeeping types: chaining scope, anchors, snapshots, and the
//! failures reported by full-chain verification.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::record::{InvoiceId, Record, RecordRef};

/// Which records share a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainScope {
    /// One chain across every generating system.
    Global,
    /// One chain per generating system instance (`SystemInfo::instance_key`).
    #[default]
    PerSystem,
}

impl ChainScope {
    /// Key of the chain `record` belongs to under this scope.
    pub fn key_for(self, record: &Record) -> String {
        match self {
            ChainScope::Global => "*".to_string(),
            ChainScope::PerSystem => record.system().instance_key(),
        }
    }
}

impl fmt::Display for ChainScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainScope::Global => f.write_str("global"),
            ChainScope::PerSystem => f.write_str("per-system"),
        }
    }
}

/// The minimum needed to link and order the next record of a chain:
/// identity, fingerprint and generation time of its tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub link: RecordRef,
    pub generated_at: DateTime<FixedOffset>,
}

impl Anchor {
    pub fn of(record: &Record) -> Self {
        Self {
            link: record.to_ref(),
            generated_at: *record.generated_at(),
        }
    }
}

/// A consistent copy of a record chain taken under the store lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub scope: ChainScope,
    /// Retained record bodies in append order.
    pub records: Vec<Record>,
    /// Per-scope anchors left behind by purges.
    pub anchors: BTreeMap<String, Anchor>,
    /// Per-scope tails as tracked by the store for the next append.
    pub tails: BTreeMap<String, Anchor>,
}

impl ChainSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn scope_key(&self, record: &Record) -> String {
        self.scope.key_for(record)
    }

    /// Records generated within `[from, to]`, in append order.
    pub fn between<'a>(
        &'a self,
        from: &'a DateTime<FixedOffset>,
        to: &'a DateTime<FixedOffset>,
    ) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| {
            let at = r.generated_at();
            at >= from && at <= to
        })
    }

    /// Every retained record for `invoice` (an issuance and its cancellation
    /// share the identity).
    pub fn find(&self, invoice: &InvoiceId) -> Vec<&Record> {
        self.records.iter().filter(|r| r.invoice() == invoice).collect()
    }

    /// Position of the record matching both identity and stored fingerprint.
    pub fn position_of(&self, link: &RecordRef) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.invoice() == &link.invoice && r.fingerprint() == link.fingerprint)
    }
}

/// What went wrong at one position of a verified chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityFailureKind {
    /// The stored fingerprint does not match the recomputed one.
    FingerprintMismatch { stored: String, recomputed: String },
    /// The declared previous link does not name the actual predecessor.
    LinkMismatch {
        expected: Option<String>,
        declared: Option<String>,
    },
    /// `is_first` and `previous` are both set or both absent.
    MalformedChaining,
}

/// One failing position reported by chain verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityFailure {
    /// Index into the retained records, in append order.
    pub position: usize,
    pub invoice: InvoiceId,
    pub kind: IntegrityFailureKind,
}

impl fmt::Display for IntegrityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IntegrityFailureKind::FingerprintMismatch { stored, recomputed } => write!(
                f,
                "record {} at position {}: stored fingerprint {} != recomputed {}",
                self.invoice, self.position, stored, recomputed
            ),
            IntegrityFailureKind::LinkMismatch { expected, declared } => write!(
                f,
                "record {} at position {}: previous link {} != predecessor {}",
                self.invoice,
                self.position,
                declared.as_deref().unwrap_or("<none>"),
                expected.as_deref().unwrap_or("<none>")
            ),
            IntegrityFailureKind::MalformedChaining => write!(
                f,
                "record {} at position {}: chaining block must set exactly one of is_first and previous",
                self.invoice, self.position
            ),
        }
    }
}
