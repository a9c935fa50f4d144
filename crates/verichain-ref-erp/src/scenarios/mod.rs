//! ERP reference runtime demo scenarios.
//!
//! Each scenario wires a fresh ledger from the embedded configuration, runs
//! against fixture records, prints what happens step by step and returns
//! what it observed so tests can assert on it.

pub mod issue_and_cancel;
pub mod period_export;
pub mod tamper_detection;

use verichain_contracts::{error::LedgerResult, record::Record};
use verichain_core::Ledger;
use verichain_detect::sign_record;

use crate::fixtures;

/// Link `record` to its scope's tail, sign it with the producer key and
/// submit it.
pub(crate) fn submit_signed(ledger: &Ledger, mut record: Record) -> LedgerResult<Record> {
    ledger.link(&mut record);
    let signature = sign_record(&fixtures::signing_key(), &record);
    record.set_signature(Some(signature));
    ledger.submit(record)
}

/// First 16 hex digits of a fingerprint, for display.
pub(crate) fn short(fingerprint: &str) -> &str {
    fingerprint.get(..16).unwrap_or(fingerprint)
}
