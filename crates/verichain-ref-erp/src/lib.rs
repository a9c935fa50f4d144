//! # verichain-ref-erp
//!
//! ERP reference runtime for the VERICHAIN invoice record ledger.
//!
//! Demonstrates three ledger scenarios using fixture data:
//!
//! 1. **Issue and cancel**: an invoice is issued, cancelled, and a stale
//!    resubmission is refused by the chain.
//! 2. **Tamper detection**: an amount is edited in a restored backup and the
//!    anomaly scanner pinpoints the altered record.
//! 3. **Period export**: a month is exported and purged, the chain keeps
//!    growing from its anchor, and a period summary is logged.
//!
//! All data is hardcoded and fictional. Nothing is sent to a tax authority.

pub mod fixtures;
pub mod runtime;
pub mod scenarios;

pub use runtime::{build_ledger, build_ledger_with_clock, erp_config};
