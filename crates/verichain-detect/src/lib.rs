//! # verichain-detect
//!
//! Anomaly detection for the VERICHAIN ledger.
//!
//! `ChainAnomalyScanner` re-runs the fingerprint, signature, chain and date
//! checks over consistent snapshots of the record chain and the event log.
//! `Ed25519KeyStore` is the reference key store behind the signature check.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verichain_detect::{ChainAnomalyScanner, Ed25519KeyStore};
//!
//! let mut keys = Ed25519KeyStore::new();
//! keys.register("B99999999", signing_key.verifying_key());
//! let scanner = ChainAnomalyScanner::new(config.detector).with_verifier(Box::new(keys));
//! let report = scanner.scan(&store.snapshot(), &events.snapshot());
//! ```

pub mod engine;
pub mod keys;

pub use engine::ChainAnomalyScanner;
pub use keys::{sign_event, sign_record, Ed25519KeyStore};

// ── Tests ─────────────────────────────────────────────────────────────────────
