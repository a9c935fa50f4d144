//! Event log entry types.
//!
//! The event log is a second hash chain, independent of the invoice record
//! chain.  The payload variant determines the event type, so an entry whose
//! payload does not fit its type cannot be built through `EventPayload`.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyFinding, ScanStats};
use crate::codes::{EventType, HashAlgorithm, IssuedBy};
use crate::export::{EventExportSummary, PeriodSummary, RecordExportSummary};
use crate::record::Party;

/// Who the event log belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventProducer {
    pub obligor_name: String,
    pub obligor_nif: String,
    pub system_id: String,
    /// Set when the log is kept by a third party or the recipient on the
    /// obligor's behalf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kept_by: Option<IssuedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keeper: Option<Party>,
}

impl EventProducer {
    /// A log kept by the obligor itself.
    pub fn new(
        obligor_name: impl Into<String>,
        obligor_nif: impl Into<String>,
        system_id: impl Into<String>,
    ) -> Self {
        Self {
            obligor_name: obligor_name.into(),
            obligor_nif: obligor_nif.into(),
            system_id: system_id.into(),
            kept_by: None,
            keeper: None,
        }
    }
}

/// Reference to a prior event: type, time and fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    pub event_type: EventType,
    pub generated_at: DateTime<FixedOffset>,
    pub fingerprint: String,
}

/// Chaining block of an event; same `is_first xor previous` rule as records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChaining {
    pub is_first: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<EventRef>,
}

impl EventChaining {
    pub fn first() -> Self {
        Self { is_first: true, previous: None }
    }

    pub fn after(previous: EventRef) -> Self {
        Self { is_first: false, previous: Some(previous) }
    }

    pub fn is_well_formed(&self) -> bool {
        self.is_first != self.previous.is_some()
    }

    pub fn previous_fingerprint(&self) -> Option<&str> {
        self.previous.as_ref().map(|p| p.fingerprint.as_str())
    }
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    LifecycleStart,
    LifecycleStop,
    RecordScanLaunched(ScanStats),
    RecordAnomaly(AnomalyFinding),
    EventScanLaunched(ScanStats),
    EventAnomaly(AnomalyFinding),
    BackupRestored,
    RecordsExported(RecordExportSummary),
    EventsExported(EventExportSummary),
    PeriodSummary(PeriodSummary),
    Other,
}

impl EventPayload {
    /// The event type this payload is logged under.
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::LifecycleStart => EventType::LifecycleStart,
            EventPayload::LifecycleStop => EventType::LifecycleStop,
            EventPayload::RecordScanLaunched(_) => EventType::RecordScanLaunched,
            EventPayload::RecordAnomaly(_) => EventType::RecordAnomalyDetected,
            EventPayload::EventScanLaunched(_) => EventType::EventScanLaunched,
            EventPayload::EventAnomaly(_) => EventType::EventAnomalyDetected,
            EventPayload::BackupRestored => EventType::BackupRestored,
            EventPayload::RecordsExported(_) => EventType::RecordsExported,
            EventPayload::EventsExported(_) => EventType::EventsExported,
            EventPayload::PeriodSummary(_) => EventType::PeriodSummary,
            EventPayload::Other => EventType::Other,
        }
    }
}

/// One entry of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub version: String,
    pub producer: EventProducer,
    pub generated_at: DateTime<FixedOffset>,
    pub event_type: EventType,
    pub payload: EventPayload,
    /// Free text, at most 100 characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_data: Option<String>,
    pub chaining: EventChaining,
    pub algorithm: HashAlgorithm,
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl EventRecord {
    pub const OTHER_DATA_MAX: usize = 100;

    pub fn to_ref(&self) -> EventRef {
        EventRef {
            event_type: self.event_type,
            generated_at: self.generated_at,
            fingerprint: self.fingerprint.clone(),
        }
    }
}

/// A consistent copy of the event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub events: Vec<EventRecord>,
}

impl EventSnapshot {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events generated within `[from, to]`.
    pub fn between<'a>(
        &'a self,
        from: &'a DateTime<FixedOffset>,
        to: &'a DateTime<FixedOffset>,
    ) -> impl Iterator<Item = &'a EventRecord> + 'a {
        self.events
            .iter()
            .filter(move |e| &e.generated_at >= from && &e.generated_at <= to)
    }
}
