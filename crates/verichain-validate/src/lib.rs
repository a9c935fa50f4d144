//! # verichain-validate
//!
//! Structural validation of candidate invoice records.
//!
//! This crate provides [`engine::RecordSchemaValidator`], which implements the
//! [`verichain_core::traits::RecordValidator`] trait.  It checks a candidate
//! in a fixed order and stops at the first violation:
//!
//! 1. **Presence and length**: required strings are non-empty and within
//!    their per-field ceilings.
//! 2. **Cardinality**: breakdown lines 1–12; rectified, substituted and
//!    recipient lists 1–1000 when present.
//! 3. **Precision**: amounts carry at most two fraction digits.
//! 4. **Consistency**: field combinations the record model forbids.
//! 5. **Chaining**: `is_first xor previous`, and a declared previous link
//!    carrying the prior record's fingerprint must also name that record.
//!
//! `validate_batch` checks a submission envelope on its own: header
//! taxpayers, the 1–1000 record bound, and that every record was issued by
//! the header's obligor.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use verichain_validate::engine::RecordSchemaValidator;
//! use verichain_core::traits::RecordValidator;
//!
//! let validator = RecordSchemaValidator::new();
//! validator.validate(&candidate, tail.as_ref())?;
//! ```

pub mod engine;
pub mod limits;

pub use engine::RecordSchemaValidator;
