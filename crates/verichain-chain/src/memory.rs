//! In-memory implementation of `RecordStore`.
//!
//! `InMemoryRecordChain` keeps the retained records, the per-scope tails and
//! the per-scope purge anchors behind one `Mutex`, so tail lookup and append
//! form a single critical section.  Readers that find the lock poisoned
//! still get the data; writers refuse with `Unavailable`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

use verichain_contracts::{
    chain::{Anchor, ChainScope, ChainSnapshot, IntegrityFailure},
    error::{ChainError, ExportError, PurgeError},
    export::RecordExportSummary,
    format::format_timestamp,
    record::{ChainLink, Record},
};
use verichain_core::traits::RecordStore;

use crate::{
    chain::verify_chain,
    export::{plan_purge, summarize},
    hash::record_fingerprint,
};

// ── Internal mutable state ────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct ChainState {
    /// Retained record bodies, in append order.
    pub(crate) records: Vec<Record>,
    /// Tail of each scope, as used to link the next append.
    pub(crate) tails: BTreeMap<String, Anchor>,
    /// Last purged record of each scope.
    pub(crate) anchors: BTreeMap<String, Anchor>,
}

// ── Public store ──────────────────────────────────────────────────────────────

/// An in-memory, append-only record chain backed by SHA-256 fingerprints.
pub struct InMemoryRecordChain {
    scope: ChainScope,
    pub(crate) state: Arc<Mutex<ChainState>>,
}

impl InMemoryRecordChain {
    pub fn new(scope: ChainScope) -> Self {
        Self {
            scope,
            state: Arc::new(Mutex::new(ChainState::default())),
        }
    }

    fn read(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> Result<MutexGuard<'_, ChainState>, String> {
        self.state
            .lock()
            .map_err(|e| format!("record chain lock poisoned: {}", e))
    }
}

impl Default for InMemoryRecordChain {
    fn default() -> Self {
        Self::new(ChainScope::default())
    }
}

/// Check `candidate`'s chaining block against the tail of its scope.
fn check_link(candidate: &Record, tail: Option<&Anchor>) -> Result<(), ChainError> {
    let broken = || ChainError::BrokenLink {
        invoice: candidate.invoice().to_string(),
        expected: tail.map(|t| t.link.fingerprint.clone()),
        declared: candidate.chaining().previous_fingerprint().map(str::to_string),
    };

    match (candidate.chaining().link(), tail) {
        (Some(ChainLink::First), None) => {}
        (Some(ChainLink::After(previous)), Some(tail)) if previous == &tail.link => {}
        _ => return Err(broken()),
    }

    if let Some(tail) = tail {
        if candidate.generated_at() < &tail.generated_at {
            return Err(ChainError::OutOfOrder {
                invoice: candidate.invoice().to_string(),
                tail_at: format_timestamp(&tail.generated_at),
                candidate_at: format_timestamp(candidate.generated_at()),
            });
        }
    }

    Ok(())
}

// ── RecordStore impl ──────────────────────────────────────────────────────────

impl RecordStore for InMemoryRecordChain {
    fn scope(&self) -> ChainScope {
        self.scope
    }

    fn tail_for(&self, record: &Record) -> Option<Anchor> {
        let key = self.scope.key_for(record);
        self.read().tails.get(&key).cloned()
    }

    /// Link-check the candidate against its scope tail, compute its
    /// fingerprint and append it.  The link check, fingerprinting and push
    /// all happen under the lock.
    fn append(&self, mut candidate: Record) -> Result<Record, ChainError> {
        let mut state = self.write().map_err(|reason| ChainError::Unavailable { reason })?;

        let key = self.scope.key_for(&candidate);
        check_link(&candidate, state.tails.get(&key))?;

        let fingerprint = record_fingerprint(&candidate);
        candidate.set_fingerprint(fingerprint);

        state.tails.insert(key.clone(), Anchor::of(&candidate));
        state.records.push(candidate.clone());

        debug!(
            scope = %key,
            invoice = %candidate.invoice(),
            fingerprint = %candidate.fingerprint(),
            length = state.records.len(),
            "record chained"
        );

        Ok(candidate)
    }

    fn snapshot(&self) -> ChainSnapshot {
        let state = self.read();
        ChainSnapshot {
            scope: self.scope,
            records: state.records.clone(),
            anchors: state.anchors.clone(),
            tails: state.tails.clone(),
        }
    }

    fn verify(&self) -> Result<(), Vec<IntegrityFailure>> {
        let snapshot = self.snapshot();
        let result = verify_chain(&snapshot);
        if let Err(failures) = &result {
            warn!(
                records = snapshot.len(),
                failures = failures.len(),
                "record chain verification failed"
            );
        }
        result
    }

    fn export_range(
        &self,
        from: &DateTime<FixedOffset>,
        to: &DateTime<FixedOffset>,
    ) -> Result<RecordExportSummary, ExportError> {
        summarize(&self.read().records, from, to)
    }

    /// Drop the exported prefix.  The last purged record of each scope
    /// becomes that scope's anchor; tails are untouched, so the next append
    /// links exactly as it would have before the purge.
    fn purge_exported(&self, summary: &RecordExportSummary) -> Result<(), PurgeError> {
        let mut state = self.write().map_err(|reason| PurgeError::Unavailable { reason })?;

        let count = match plan_purge(&state.records, summary) {
            Ok(count) => count,
            Err(e) => {
                warn!(last = %summary.last.invoice, error = %e, "purge rejected");
                return Err(e);
            }
        };

        let purged: Vec<Record> = state.records.drain(..count).collect();
        for record in &purged {
            state.anchors.insert(self.scope.key_for(record), Anchor::of(record));
        }

        info!(
            purged = purged.len(),
            retained = state.records.len(),
            anchors = state.anchors.len(),
            "exported records purged"
        );
        Ok(())
    }

    fn restore(&self, backup: ChainSnapshot) -> Result<(), ChainError> {
        // Tails and anchors are keyed by scope; installing foreign keys would
        // let the next append start a second chain.
        if backup.scope != self.scope {
            warn!(
                backup_scope = %backup.scope,
                store_scope = %self.scope,
                "refusing backup taken under a different chaining scope"
            );
            return Err(ChainError::ScopeMismatch {
                backup: backup.scope.to_string(),
                store: self.scope.to_string(),
            });
        }

        let mut state = self.write().map_err(|reason| ChainError::Unavailable { reason })?;

        // A backup without tail bookkeeping links the next append to the
        // last restored record of each scope.
        let mut tails = backup.tails;
        if tails.is_empty() {
            tails = backup.anchors.clone();
            for record in &backup.records {
                tails.insert(self.scope.key_for(record), Anchor::of(record));
            }
        }

        info!(
            records = backup.records.len(),
            anchors = backup.anchors.len(),
            "record chain restored"
        );

        state.records = backup.records;
        state.tails = tails;
        state.anchors = backup.anchors;
        Ok(())
    }
}
