//! # verichain-contracts
//!
//! Shared types, code lists, and error types for the VERICHAIN invoice ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, wire formats and error types.

pub mod anomaly;
pub mod chain;
pub mod codes;
pub mod error;
pub mod event;
pub mod export;
pub mod format;
pub mod record;
pub mod submission;
