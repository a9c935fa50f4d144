//! Full-chain verification.
//!
//! Every retained record is checked against two rules:
//!
//! 1. **Fingerprint correctness**: the stored fingerprint equals the one
//!    recomputed from the record's canonical form.
//! 2. **Link correctness**: the declared previous link names the stored
//!    fingerprint of the record's predecessor in the same chaining scope, or
//!    the scope's anchor when the predecessor was purged.  A record declaring
//!    itself first must have no predecessor at all.
//!
//! Verification does not stop at the first failure: every failing position
//! is reported.

use std::collections::BTreeMap;

use verichain_contracts::{
    chain::{ChainSnapshot, IntegrityFailure, IntegrityFailureKind},
    record::ChainLink,
};

use crate::hash::record_fingerprint;

/// Verify every fingerprint and every link of `snapshot`.
///
/// An empty chain is valid.
pub fn verify_chain(snapshot: &ChainSnapshot) -> Result<(), Vec<IntegrityFailure>> {
    // Stored fingerprint of the last record seen per scope, seeded by the
    // anchors purges left behind.
    let mut predecessors: BTreeMap<String, String> = snapshot
        .anchors
        .iter()
        .map(|(key, anchor)| (key.clone(), anchor.link.fingerprint.clone()))
        .collect();

    let mut failures = Vec::new();

    for (position, record) in snapshot.records.iter().enumerate() {
        let key = snapshot.scope_key(record);

        let recomputed = record_fingerprint(record);
        if recomputed != record.fingerprint() {
            failures.push(IntegrityFailure {
                position,
                invoice: record.invoice().clone(),
                kind: IntegrityFailureKind::FingerprintMismatch {
                    stored: record.fingerprint().to_string(),
                    recomputed,
                },
            });
        }

        let expected = predecessors.get(&key).cloned();
        let kind = match record.chaining().link() {
            None => Some(IntegrityFailureKind::MalformedChaining),
            Some(ChainLink::First) if expected.is_some() => {
                Some(IntegrityFailureKind::LinkMismatch { expected, declared: None })
            }
            Some(ChainLink::After(previous)) if expected.as_deref() != Some(&previous.fingerprint) => {
                Some(IntegrityFailureKind::LinkMismatch {
                    expected,
                    declared: Some(previous.fingerprint.clone()),
                })
            }
            _ => None,
        };
        if let Some(kind) = kind {
            failures.push(IntegrityFailure {
                position,
                invoice: record.invoice().clone(),
                kind,
            });
        }

        predecessors.insert(key, record.fingerprint().to_string());
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}
