//! In-memory implementation of `EventSink`.
//!
//! The event log is a single chain.  Before every append the current tail is
//! re-verified: its fingerprint must recompute and its link must name its
//! predecessor.  A failure halts the log for good; every later call returns
//! `LogIntegrityError` until a backup is restored.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, error, info};

use verichain_contracts::{
    codes::HashAlgorithm,
    error::{ExportError, LogIntegrityError},
    event::{EventChaining, EventPayload, EventProducer, EventRecord, EventSnapshot},
    export::EventExportSummary,
    format::format_timestamp,
};
use verichain_core::traits::EventSink;

use crate::hash::event_fingerprint;

/// Version written into every event.
pub const EVENT_VERSION: &str = "1.0";

/// Source of event timestamps.
pub type Clock = Box<dyn Fn() -> DateTime<FixedOffset> + Send + Sync>;

#[derive(Default)]
pub(crate) struct LogState {
    pub(crate) events: Vec<EventRecord>,
    /// Why the log stopped accepting entries, once it has.
    pub(crate) halted: Option<String>,
}

/// An in-memory, append-only, hash-chained event log.
pub struct InMemoryEventLog {
    producer: EventProducer,
    clock: Clock,
    pub(crate) state: Arc<Mutex<LogState>>,
}

impl InMemoryEventLog {
    /// A log stamped with the system clock.
    pub fn new(producer: EventProducer) -> Self {
        Self::with_clock(producer, Box::new(|| Utc::now().fixed_offset()))
    }

    pub fn with_clock(producer: EventProducer, clock: Clock) -> Self {
        Self {
            producer,
            clock,
            state: Arc::new(Mutex::new(LogState::default())),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.read().halted.is_some()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LogState>, LogIntegrityError> {
        self.state.lock().map_err(|e| LogIntegrityError {
            reason: format!("event log lock poisoned: {}", e),
        })
    }

    fn read(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Re-verify the last entry of `events` against its own content and its
/// predecessor.
pub fn check_tail(events: &[EventRecord]) -> Result<(), String> {
    let Some(tail) = events.last() else {
        return Ok(());
    };

    let recomputed = event_fingerprint(tail);
    if recomputed != tail.fingerprint {
        return Err(format!(
            "tail event {} fingerprint {} does not recompute ({})",
            tail.event_type, tail.fingerprint, recomputed
        ));
    }

    let predecessor = events.len().checked_sub(2).map(|i| &events[i]);
    let linked = match (predecessor, &tail.chaining) {
        (None, c) => c.is_first && c.previous.is_none(),
        (Some(prev), c) => !c.is_first && c.previous.as_ref() == Some(&prev.to_ref()),
    };
    if !linked {
        return Err(format!(
            "tail event {} does not link to its predecessor",
            tail.event_type
        ));
    }

    Ok(())
}

/// Refuse a halted log, and halt one whose tail no longer verifies.
fn ensure_intact(state: &mut LogState) -> Result<(), LogIntegrityError> {
    if let Some(reason) = &state.halted {
        return Err(LogIntegrityError { reason: reason.clone() });
    }

    if let Err(reason) = check_tail(&state.events) {
        error!(
            events = state.events.len(),
            reason = %reason,
            "event log integrity failure, halting"
        );
        state.halted = Some(reason.clone());
        return Err(LogIntegrityError { reason });
    }

    Ok(())
}

fn truncate(text: String, max: usize) -> String {
    if text.chars().count() > max {
        text.chars().take(max).collect()
    } else {
        text
    }
}

impl EventSink for InMemoryEventLog {
    fn log_event(
        &self,
        payload: EventPayload,
        other_data: Option<String>,
    ) -> Result<EventRecord, LogIntegrityError> {
        let mut state = self.lock()?;
        ensure_intact(&mut state)?;

        // Timestamps never run backwards along the log.
        let mut generated_at = (self.clock)();
        let chaining = match state.events.last() {
            Some(tail) => {
                if generated_at < tail.generated_at {
                    generated_at = tail.generated_at;
                }
                EventChaining::after(tail.to_ref())
            }
            None => EventChaining::first(),
        };

        let mut event = EventRecord {
            version: EVENT_VERSION.to_string(),
            producer: self.producer.clone(),
            generated_at,
            event_type: payload.event_type(),
            payload,
            other_data: other_data.map(|t| truncate(t, EventRecord::OTHER_DATA_MAX)),
            chaining,
            algorithm: HashAlgorithm::default(),
            fingerprint: String::new(),
            signature: None,
        };
        event.fingerprint = event_fingerprint(&event);

        debug!(
            event_type = %event.event_type,
            fingerprint = %event.fingerprint,
            length = state.events.len() + 1,
            "event logged"
        );

        state.events.push(event.clone());
        Ok(event)
    }

    fn check_integrity(&self) -> Result<(), LogIntegrityError> {
        ensure_intact(&mut *self.lock()?)
    }

    fn snapshot(&self) -> EventSnapshot {
        EventSnapshot { events: self.read().events.clone() }
    }

    fn export_range(
        &self,
        from: &DateTime<FixedOffset>,
        to: &DateTime<FixedOffset>,
    ) -> Result<EventExportSummary, ExportError> {
        let state = self.read();
        let mut window = state
            .events
            .iter()
            .filter(|e| &e.generated_at >= from && &e.generated_at <= to);

        let first = window.next().ok_or_else(|| ExportError::EmptyRange {
            from: format_timestamp(from),
            to: format_timestamp(to),
        })?;
        let (count, last) = window.fold((1u64, first), |(n, _), e| (n + 1, e));

        Ok(EventExportSummary {
            from: *from,
            to: *to,
            first: first.to_ref(),
            last: last.to_ref(),
            event_count: count,
        })
    }

    fn restore(&self, backup: EventSnapshot) -> Result<(), LogIntegrityError> {
        let mut state = self.lock()?;

        info!(
            events = backup.len(),
            was_halted = state.halted.is_some(),
            "event log restored"
        );

        state.events = backup.events;
        state.halted = None;
        Ok(())
    }
}
