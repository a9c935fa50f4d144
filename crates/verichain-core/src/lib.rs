//! # verichain-core
//!
//! Trait seams and orchestration for the VERICHAIN invoice ledger.
//!
//! This crate provides:
//! - The component traits (`RecordValidator`, `RecordStore`, `EventSink`,
//!   `AnomalyScanner`, `SignatureVerifier`)
//! - The `Ledger` that wires them together in the correct order
//! - `LedgerConfig`, the TOML configuration shared by the binaries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verichain_core::{Ledger, LedgerConfig};
//!
//! let config = LedgerConfig::from_file(Path::new("ledger.toml"))?;
//! let ledger = Ledger::new(validator, store, events, scanner);
//! ledger.submit_linked(candidate)?;
//! ```

pub mod config;
pub mod ledger;
pub mod traits;

pub use config::LedgerConfig;
pub use ledger::Ledger;
