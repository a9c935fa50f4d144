//! Period export and summary types.

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::codes::EventType;
use crate::event::EventRef;
use crate::record::{Record, RecordRef};

/// Describes a contiguous exported range of the record chain.
///
/// `first` and `last` let a downstream verifier re-anchor chain continuity
/// once the bodies have been purged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordExportSummary {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
    pub first: RecordRef,
    pub last: RecordRef,
    pub issuance_count: u64,
    pub tax_total_sum: Decimal,
    pub gross_total_sum: Decimal,
    pub cancellation_count: u64,
    /// True once the exported bodies are no longer retained.
    pub purged: bool,
}

impl RecordExportSummary {
    pub fn record_count(&self) -> u64 {
        self.issuance_count + self.cancellation_count
    }
}

/// Describes an exported range of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventExportSummary {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
    pub first: EventRef,
    pub last: EventRef,
    pub event_count: u64,
}

/// Number of events of one type within a summary window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeCount {
    pub event_type: EventType,
    pub count: u64,
}

/// Periodic summary: per-type event counts plus the record statistics of
/// the same window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
    pub event_counts: Vec<EventTypeCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_record: Option<RecordRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_record: Option<RecordRef>,
    pub issuance_count: u64,
    pub tax_total_sum: Decimal,
    pub gross_total_sum: Decimal,
    pub cancellation_count: u64,
}

/// Running counts and sums over a set of records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordTotals {
    pub first: Option<RecordRef>,
    pub last: Option<RecordRef>,
    pub issuance_count: u64,
    pub tax_total_sum: Decimal,
    pub gross_total_sum: Decimal,
    pub cancellation_count: u64,
}

impl RecordTotals {
    pub fn add(&mut self, record: &Record) {
        if self.first.is_none() {
            self.first = Some(record.to_ref());
        }
        self.last = Some(record.to_ref());
        match record {
            Record::Issuance(r) => {
                self.issuance_count += 1;
                self.tax_total_sum += r.tax_total;
                self.gross_total_sum += r.gross_total;
            }
            Record::Cancellation(_) => self.cancellation_count += 1,
        }
    }
}

impl<'a> FromIterator<&'a Record> for RecordTotals {
    fn from_iter<I: IntoIterator<Item = &'a Record>>(iter: I) -> Self {
        let mut totals = RecordTotals::default();
        for record in iter {
            totals.add(record);
        }
        totals
    }
}
