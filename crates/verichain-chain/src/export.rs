//! Period export and purge planning over the retained record bodies.
//!
//! A purge may only remove a prefix of the retained history that ends at the
//! summary's last record.  The plan is computed and checked in full before
//! the store removes anything.
//!
//! Windows select by generation time while the prefix follows append order.
//! Under the per-system scope, records of different systems can interleave
//! so that a window skips a record appended between two it covers.  Such a
//! summary does not describe the prefix and the purge is refused with
//! `SummaryMismatch`; widening the window to include the interleaved record
//! makes it purgeable.

use chrono::{DateTime, FixedOffset};

use verichain_contracts::{
    error::{ExportError, PurgeError},
    export::{RecordExportSummary, RecordTotals},
    format::format_timestamp,
    record::Record,
};

use crate::hash::record_fingerprint;

/// Summarize the records generated within `[from, to]`.
pub fn summarize(
    records: &[Record],
    from: &DateTime<FixedOffset>,
    to: &DateTime<FixedOffset>,
) -> Result<RecordExportSummary, ExportError> {
    let totals: RecordTotals = records
        .iter()
        .filter(|r| r.generated_at() >= from && r.generated_at() <= to)
        .collect();

    let (first, last) = match (totals.first, totals.last) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(ExportError::EmptyRange {
                from: format_timestamp(from),
                to: format_timestamp(to),
            })
        }
    };

    Ok(RecordExportSummary {
        from: *from,
        to: *to,
        first,
        last,
        issuance_count: totals.issuance_count,
        tax_total_sum: totals.tax_total_sum,
        gross_total_sum: totals.gross_total_sum,
        cancellation_count: totals.cancellation_count,
        purged: false,
    })
}

/// Number of leading records `summary` allows the store to drop.
///
/// # Errors
///
/// - `AnchorLoss` when the summary's last record is not retained (a second
///   purge of the same range) or its stored fingerprint no longer recomputes,
///   since the anchor left behind would not be trustworthy.
/// - `SummaryMismatch` when the first record is missing or the counts and
///   sums differ from the retained prefix.
/// - `NotPrefix` when older records precede the exported range.
pub fn plan_purge(records: &[Record], summary: &RecordExportSummary) -> Result<usize, PurgeError> {
    let anchor = summary.last.invoice.to_string();

    let last = records
        .iter()
        .position(|r| r.to_ref() == summary.last)
        .ok_or_else(|| PurgeError::AnchorLoss {
            anchor: anchor.clone(),
            reason: "the last exported record is no longer retained".to_string(),
        })?;

    if record_fingerprint(&records[last]) != summary.last.fingerprint {
        return Err(PurgeError::AnchorLoss {
            anchor,
            reason: "the stored fingerprint does not recompute".to_string(),
        });
    }

    let first = records
        .iter()
        .position(|r| r.to_ref() == summary.first)
        .ok_or_else(|| PurgeError::SummaryMismatch {
            reason: format!("first record {} is not retained", summary.first.invoice),
        })?;

    if first > last {
        return Err(PurgeError::SummaryMismatch {
            reason: "first record follows last record".to_string(),
        });
    }
    if first > 0 {
        return Err(PurgeError::NotPrefix {
            retained: records[0].invoice().to_string(),
        });
    }

    let totals: RecordTotals = records[..=last].iter().collect();
    let matches = totals.issuance_count == summary.issuance_count
        && totals.cancellation_count == summary.cancellation_count
        && totals.tax_total_sum == summary.tax_total_sum
        && totals.gross_total_sum == summary.gross_total_sum;
    if !matches {
        return Err(PurgeError::SummaryMismatch {
            reason: format!(
                "summary counts {} issuances and {} cancellations, retained prefix holds {} and {}",
                summary.issuance_count,
                summary.cancellation_count,
                totals.issuance_count,
                totals.cancellation_count
            ),
        });
    }

    Ok(last + 1)
}
