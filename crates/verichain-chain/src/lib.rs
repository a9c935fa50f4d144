//! # verichain-chain
//!
//! Append-only, SHA-256 hash-chained invoice record store and event log for
//! the VERICHAIN ledger.
//!
//! ## Overview
//!
//! Every appended record carries the fingerprint of its scope predecessor in
//! its chaining block, and its own fingerprint commits to that link.  Editing
//! any stored field, or any link, is caught by `verify_chain` and by the
//! anomaly detector.  The event log is a second, independent chain that
//! re-verifies its tail before every append.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verichain_chain::InMemoryRecordChain;
//! use verichain_core::traits::RecordStore;
//!
//! let chain = InMemoryRecordChain::new(ChainScope::PerSystem);
//! let stored = chain.append(candidate)?;
//! assert!(chain.verify().is_ok());
//! ```

pub mod chain;
pub mod events;
pub mod export;
pub mod hash;
pub mod memory;

pub use chain::verify_chain;
pub use events::InMemoryEventLog;
pub use hash::{canonical_event, canonical_record, event_fingerprint, record_fingerprint, GENESIS_HASH};
pub use memory::InMemoryRecordChain;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    };
    use std::thread;

    use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
    use rust_decimal_macros::dec;

    use verichain_contracts::{
        chain::{ChainScope, IntegrityFailureKind},
        codes::{
            EventType, GeneratedBy, HashAlgorithm, IdType, InvoiceType, IssuedBy,
            OperationQualification, RegimeKey, TaxType,
        },
        error::{ChainError, ExportError, PurgeError},
        event::{EventPayload, EventProducer},
        record::{
            CancellationRecord, Chaining, ForeignId, InvoiceId, IssuanceRecord, Party, Record,
            SystemInfo, TaxLine,
        },
    };
    use verichain_core::traits::{EventSink, RecordStore};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn ts(minute: i64) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-02-14T10:00:00+01:00").unwrap() + Duration::minutes(minute)
    }

    fn system(installation: &str) -> SystemInfo {
        SystemInfo {
            producer_name: "Software Ejemplo S.L.".to_string(),
            producer_nif: "B99999999".to_string(),
            other_id: None,
            system_name: "Facturador".to_string(),
            system_id: "SI".to_string(),
            version: "1.0".to_string(),
            installation_number: installation.to_string(),
            verifactu_only: true,
            multi_taxpayer_capable: false,
            multiple_taxpayers: false,
        }
    }

    fn invoice(series: &str) -> InvoiceId {
        InvoiceId::new("B12345678", series, NaiveDate::from_ymd_opt(2024, 2, 14).unwrap())
    }

    /// An unchained issuance for `series`, generated at `minute`.
    fn issuance(series: &str, minute: i64) -> Record {
        Record::Issuance(IssuanceRecord {
            version: "1.0".to_string(),
            invoice: invoice(series),
            external_ref: None,
            issuer_name: "Empresa Ejemplo S.L.".to_string(),
            remedy: false,
            previous_rejection: false,
            invoice_type: InvoiceType::Invoice,
            rectification_type: None,
            rectified_invoices: None,
            substituted_invoices: None,
            rectification_amount: None,
            operation_date: None,
            description: "Venta de productos informáticos".to_string(),
            simplified_art_7273: false,
            no_recipient_art_61d: false,
            macrodata: false,
            issued_by: None,
            third_party: None,
            recipients: Some(vec![Party::with_nif("Cliente Ejemplo S.A.", "A87654321")]),
            coupon: false,
            breakdown: vec![TaxLine {
                tax: Some(TaxType::Iva),
                regime: RegimeKey::General,
                qualification: OperationQualification::SubjectNotExempt,
                exemption: None,
                rate: Some(dec!(21.00)),
                taxable_base: dec!(1000.00),
                taxable_base_at_cost: None,
                tax_amount: Some(dec!(210.00)),
                surcharge_rate: None,
                surcharge_amount: None,
            }],
            tax_total: dec!(210.00),
            gross_total: dec!(1210.00),
            chaining: Chaining::first(),
            system: system("0001"),
            generated_at: ts(minute),
            agreement_registration: None,
            system_agreement_id: None,
            algorithm: HashAlgorithm::Sha256,
            fingerprint: String::new(),
            signature: None,
        })
    }

    fn cancellation(series: &str, minute: i64) -> Record {
        Record::Cancellation(CancellationRecord {
            version: "1.0".to_string(),
            invoice: invoice(series),
            external_ref: None,
            no_prior_record: false,
            previous_rejection: false,
            generated_by: Some(GeneratedBy::Issuer),
            generator: Some(Party::with_nif("Empresa Ejemplo S.L.", "B12345678")),
            chaining: Chaining::first(),
            system: system("0001"),
            generated_at: ts(minute),
            algorithm: HashAlgorithm::Sha256,
            fingerprint: String::new(),
            signature: None,
        })
    }

    /// Link `record` to the current tail of its scope and append it.
    fn append_linked(chain: &InMemoryRecordChain, mut record: Record) -> Record {
        let chaining = match chain.tail_for(&record) {
            Some(tail) => Chaining::after(tail.link),
            None => Chaining::first(),
        };
        record.set_chaining(chaining);
        chain.append(record).unwrap()
    }

    fn producer() -> EventProducer {
        EventProducer::new("Empresa Ejemplo S.L.", "B12345678", "SI")
    }

    /// An event log whose clock advances one minute per call.
    fn ticking_log() -> InMemoryEventLog {
        let tick = AtomicI64::new(0);
        InMemoryEventLog::with_clock(
            producer(),
            Box::new(move || ts(tick.fetch_add(1, Ordering::SeqCst))),
        )
    }

    // ── Fingerprints ──────────────────────────────────────────────────────────

    /// The first record of a chain links to the genesis sentinel.
    #[test]
    fn test_first_record_links_genesis() {
        let canonical = canonical_record(&issuance("F-1", 0));
        assert!(
            canonical.ends_with(&format!("PreviousFingerprint={}&", GENESIS_HASH)),
            "canonical form must end with the genesis link: {}",
            canonical
        );
    }

    /// The canonical form renders codes, dates, decimals and timestamps in
    /// their wire formats.
    #[test]
    fn test_canonical_form_wire_formats() {
        let canonical = canonical_record(&issuance("F-1", 30));

        assert!(canonical.starts_with("Kind=issuance&Version=1.0&IssuerId=B12345678&"));
        assert!(canonical.contains("&IssueDate=14-02-2024&"));
        assert!(canonical.contains("&InvoiceType=F1&"));
        assert!(canonical.contains("&Breakdown[0].Rate=21.00&"));
        assert!(canonical.contains("&GrossTotal=1210.00&"));
        assert!(canonical.contains("&GeneratedAt=2024-02-14T10:30:00+01:00&"));
        assert!(!canonical.contains("ExternalRef"), "absent optionals are omitted");
    }

    /// Identical input always yields the identical fingerprint.
    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = record_fingerprint(&issuance("F-1", 0));
        let b = record_fingerprint(&issuance("F-1", 0));

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    /// Swapping the values of two optional fields changes the digest.
    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let mut a = issuance("F-1", 0);
        let mut b = issuance("F-1", 0);
        if let (Record::Issuance(a), Record::Issuance(b)) = (&mut a, &mut b) {
            a.external_ref = Some("X1".to_string());
            a.agreement_registration = Some("Y1".to_string());
            b.external_ref = Some("Y1".to_string());
            b.agreement_registration = Some("X1".to_string());
        }

        assert_ne!(record_fingerprint(&a), record_fingerprint(&b));
    }

    /// Stored fingerprint and signature do not feed the digest.
    #[test]
    fn test_fingerprint_ignores_stored_fields() {
        let plain = issuance("F-1", 0);
        let mut decorated = plain.clone();
        decorated.set_fingerprint("f".repeat(64));
        decorated.set_signature(Some("00ff".to_string()));

        assert_eq!(record_fingerprint(&plain), record_fingerprint(&decorated));
    }

    /// The producer's foreign identifier is part of the system descriptor.
    #[test]
    fn test_fingerprint_commits_to_producer_other_id() {
        let plain = issuance("F-1", 0);
        let mut identified = plain.clone();
        if let Record::Issuance(r) = &mut identified {
            r.system.other_id = Some(ForeignId {
                country_code: "PT".to_string(),
                id_type: IdType::VatId,
                id: "PT123456789".to_string(),
            });
        }

        let canonical = canonical_record(&identified);
        assert!(canonical.contains(
            "&ProducerNif=B99999999&ProducerCountryCode=PT&ProducerIdType=02&ProducerId=PT123456789&"
        ));
        assert_ne!(record_fingerprint(&plain), record_fingerprint(&identified));
    }

    /// Pair delimiters inside a value are escaped, so free text cannot
    /// impersonate an omitted optional field.
    #[test]
    fn test_delimiters_in_values_cannot_forge_fields() {
        let honest = issuance("F-1", 0);
        let mut forged = honest.clone();
        if let Record::Issuance(r) = &mut forged {
            r.recipients = Some(vec![Party {
                name: "Cliente Ejemplo S.A.&Recipient[0].Nif=A87654321".to_string(),
                nif: None,
                foreign_id: None,
            }]);
        }

        let canonical = canonical_record(&forged);
        assert!(
            canonical.contains("Recipient[0].Name=Cliente Ejemplo S.A.%26Recipient[0].Nif%3DA87654321&"),
            "delimiters must be escaped: {}",
            canonical
        );
        assert_ne!(canonical_record(&honest), canonical);
        assert_ne!(record_fingerprint(&honest), record_fingerprint(&forged));
    }

    /// A restored body whose text smuggles in a field boundary fails
    /// verification.
    #[test]
    fn test_verify_catches_forged_field_boundary() {
        let chain = InMemoryRecordChain::default();
        append_linked(&chain, issuance("F-1", 0));

        let mut backup = chain.snapshot();
        if let Record::Issuance(r) = &mut backup.records[0] {
            r.recipients = Some(vec![Party {
                name: "Cliente Ejemplo S.A.&Recipient[0].Nif=A87654321".to_string(),
                nif: None,
                foreign_id: None,
            }]);
        }
        chain.restore(backup).unwrap();

        let failures = chain.verify().unwrap_err();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0].kind, IntegrityFailureKind::FingerprintMismatch { .. }));
    }

    /// The declared previous fingerprint feeds the digest.
    #[test]
    fn test_fingerprint_commits_to_link() {
        let first = issuance("F-1", 0);
        let mut linked = issuance("F-1", 0);
        linked.set_chaining(Chaining::after(verichain_contracts::record::RecordRef {
            invoice: invoice("F-0"),
            fingerprint: "a".repeat(64),
        }));

        assert_ne!(record_fingerprint(&first), record_fingerprint(&linked));
    }

    // ── Appends ───────────────────────────────────────────────────────────────

    /// N sequential appends verify with zero failures.
    #[test]
    fn test_sequential_appends_verify() {
        let chain = InMemoryRecordChain::default();
        for i in 0..10 {
            let series = format!("F-{}", i);
            if i % 3 == 2 {
                append_linked(&chain, cancellation(&series, i));
            } else {
                append_linked(&chain, issuance(&series, i));
            }
        }

        assert_eq!(chain.snapshot().len(), 10);
        assert_eq!(chain.verify(), Ok(()));
    }

    /// A(first) then B(prev = h1) succeeds; C(prev = "wrong") fails with
    /// `BrokenLink` and the tail stays at h2.
    #[test]
    fn test_broken_link_leaves_chain_unchanged() {
        let chain = InMemoryRecordChain::default();

        let a = append_linked(&chain, issuance("A", 0));
        let h1 = a.fingerprint().to_string();

        let b = append_linked(&chain, issuance("B", 1));
        let h2 = b.fingerprint().to_string();
        assert_eq!(b.chaining().previous_fingerprint(), Some(h1.as_str()));
        assert_ne!(h1, h2);

        let mut c = issuance("C", 2);
        c.set_chaining(Chaining::after(verichain_contracts::record::RecordRef {
            invoice: invoice("B"),
            fingerprint: "wrong".to_string(),
        }));
        let err = chain.append(c).unwrap_err();

        match err {
            ChainError::BrokenLink { expected, declared, .. } => {
                assert_eq!(expected.as_deref(), Some(h2.as_str()));
                assert_eq!(declared.as_deref(), Some("wrong"));
            }
            other => panic!("expected BrokenLink, got {:?}", other),
        }
        assert_eq!(chain.snapshot().len(), 2);
        assert_eq!(chain.tail_for(&b).unwrap().link.fingerprint, h2);
    }

    /// A first record on a non-empty scope, or a linked record on an empty
    /// one, is a broken link.
    #[test]
    fn test_first_flag_must_match_scope_state() {
        let chain = InMemoryRecordChain::default();

        let mut orphan = issuance("F-1", 0);
        orphan.set_chaining(Chaining::after(verichain_contracts::record::RecordRef {
            invoice: invoice("F-0"),
            fingerprint: "a".repeat(64),
        }));
        assert!(matches!(chain.append(orphan), Err(ChainError::BrokenLink { .. })));

        append_linked(&chain, issuance("F-1", 0));
        let second_first = issuance("F-2", 1);
        assert!(matches!(chain.append(second_first), Err(ChainError::BrokenLink { .. })));
    }

    /// A candidate generated before the tail is rejected.
    #[test]
    fn test_out_of_order_append() {
        let chain = InMemoryRecordChain::default();
        append_linked(&chain, issuance("F-1", 10));

        let mut late = issuance("F-2", 5);
        late.set_chaining(Chaining::after(chain.tail_for(&late).unwrap().link));

        assert!(matches!(chain.append(late), Err(ChainError::OutOfOrder { .. })));
        assert_eq!(chain.snapshot().len(), 1);
    }

    /// Each generating system gets its own chain under the per-system scope,
    /// and they share one under the global scope.
    #[test]
    fn test_chaining_scopes() {
        let mut other = issuance("G-1", 1);
        if let Record::Issuance(r) = &mut other {
            r.system = system("0002");
        }

        let per_system = InMemoryRecordChain::new(ChainScope::PerSystem);
        append_linked(&per_system, issuance("F-1", 0));
        let stored = append_linked(&per_system, other.clone());
        assert!(stored.chaining().is_first, "a new system starts its own chain");
        assert_eq!(per_system.verify(), Ok(()));

        let global = InMemoryRecordChain::new(ChainScope::Global);
        let first = append_linked(&global, issuance("F-1", 0));
        let stored = append_linked(&global, other);
        assert_eq!(stored.chaining().previous_fingerprint(), Some(first.fingerprint()));
        assert_eq!(global.verify(), Ok(()));
    }

    /// Appends racing from several threads form one valid chain; a lost
    /// race surfaces as `BrokenLink` and the caller retries.
    #[test]
    fn test_concurrent_appends() {
        let chain = Arc::new(InMemoryRecordChain::default());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let chain = Arc::clone(&chain);
                thread::spawn(move || {
                    for i in 0..10 {
                        let series = format!("T{}-{}", t, i);
                        loop {
                            let mut record = issuance(&series, 0);
                            let chaining = match chain.tail_for(&record) {
                                Some(tail) => Chaining::after(tail.link),
                                None => Chaining::first(),
                            };
                            record.set_chaining(chaining);
                            match chain.append(record) {
                                Ok(_) => break,
                                Err(ChainError::BrokenLink { .. }) => continue,
                                Err(e) => panic!("unexpected append error: {}", e),
                            }
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(chain.snapshot().len(), 40);
        assert_eq!(chain.verify(), Ok(()));
    }

    // ── Verification ──────────────────────────────────────────────────────────

    /// Altering a stored fingerprint is reported at that position, and the
    /// successor's link no longer matches it.
    #[test]
    fn test_verify_reports_tampering() {
        let chain = InMemoryRecordChain::default();
        for i in 0..4 {
            append_linked(&chain, issuance(&format!("F-{}", i), i));
        }

        {
            let mut state = chain.state.lock().unwrap();
            state.records[2].set_fingerprint("0".repeat(63) + "1");
        }

        let failures = chain.verify().unwrap_err();

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].position, 2);
        assert!(matches!(failures[0].kind, IntegrityFailureKind::FingerprintMismatch { .. }));
        assert_eq!(failures[1].position, 3);
        assert!(matches!(failures[1].kind, IntegrityFailureKind::LinkMismatch { .. }));
    }

    /// Editing a body field breaks only that record's fingerprint.
    #[test]
    fn test_verify_reports_content_edit() {
        let chain = InMemoryRecordChain::default();
        for i in 0..3 {
            append_linked(&chain, issuance(&format!("F-{}", i), i));
        }

        {
            let mut state = chain.state.lock().unwrap();
            if let Record::Issuance(r) = &mut state.records[0] {
                r.gross_total = dec!(12100.00);
            }
        }

        let failures = chain.verify().unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].invoice, invoice("F-0"));
    }

    // ── Export and purge ──────────────────────────────────────────────────────

    /// Export sums issuance totals and counts both record kinds.
    #[test]
    fn test_export_range_totals() {
        let chain = InMemoryRecordChain::default();
        append_linked(&chain, issuance("F-1", 0));
        append_linked(&chain, issuance("F-2", 1));
        append_linked(&chain, cancellation("F-1", 2));
        append_linked(&chain, issuance("F-3", 30));

        let summary = chain.export_range(&ts(0), &ts(10)).unwrap();

        assert_eq!(summary.issuance_count, 2);
        assert_eq!(summary.cancellation_count, 1);
        assert_eq!(summary.tax_total_sum, dec!(420.00));
        assert_eq!(summary.gross_total_sum, dec!(2420.00));
        assert_eq!(summary.first.invoice, invoice("F-1"));
        assert_eq!(summary.last.invoice, invoice("F-1"));
        assert!(!summary.purged);
    }

    #[test]
    fn test_export_empty_range() {
        let chain = InMemoryRecordChain::default();
        append_linked(&chain, issuance("F-1", 0));

        let err = chain.export_range(&ts(60), &ts(120)).unwrap_err();
        assert!(matches!(err, ExportError::EmptyRange { .. }));
    }

    /// Export, purge, then a fresh append still succeeds and verifies
    /// against the retained anchor.  Purging the same range again would lose
    /// the anchor and is refused.
    #[test]
    fn test_purge_then_append_verifies_against_anchor() {
        let chain = InMemoryRecordChain::default();
        append_linked(&chain, issuance("F-1", 0));
        let last = append_linked(&chain, issuance("F-2", 1));
        append_linked(&chain, issuance("F-3", 30));

        let summary = chain.export_range(&ts(0), &ts(10)).unwrap();
        chain.purge_exported(&summary).unwrap();

        let snapshot = chain.snapshot();
        assert_eq!(snapshot.len(), 1);
        let anchor = snapshot.anchors.values().next().unwrap();
        assert_eq!(anchor.link, last.to_ref());

        append_linked(&chain, issuance("F-4", 31));
        assert_eq!(chain.verify(), Ok(()));

        let err = chain.purge_exported(&summary).unwrap_err();
        assert!(matches!(err, PurgeError::AnchorLoss { .. }));
        assert_eq!(chain.snapshot().len(), 2, "a rejected purge removes nothing");
    }

    /// Purging a whole scope leaves the anchor as its only trace; the next
    /// append links to it.
    #[test]
    fn test_purge_everything_keeps_tail() {
        let chain = InMemoryRecordChain::default();
        append_linked(&chain, issuance("F-1", 0));
        let last = append_linked(&chain, issuance("F-2", 1));

        let summary = chain.export_range(&ts(0), &ts(10)).unwrap();
        chain.purge_exported(&summary).unwrap();
        assert!(chain.snapshot().is_empty());

        let next = append_linked(&chain, issuance("F-3", 2));
        assert_eq!(next.chaining().previous_fingerprint(), Some(last.fingerprint()));
        assert_eq!(chain.verify(), Ok(()));
    }

    /// A range that does not start at the oldest retained record would leave
    /// a hole.
    #[test]
    fn test_purge_must_be_prefix() {
        let chain = InMemoryRecordChain::default();
        append_linked(&chain, issuance("F-1", 0));
        append_linked(&chain, issuance("F-2", 20));
        append_linked(&chain, issuance("F-3", 21));

        let summary = chain.export_range(&ts(15), &ts(30)).unwrap();
        let err = chain.purge_exported(&summary).unwrap_err();

        assert!(matches!(err, PurgeError::NotPrefix { .. }));
    }

    /// A summary whose counts were edited no longer describes the data.
    #[test]
    fn test_purge_summary_mismatch() {
        let chain = InMemoryRecordChain::default();
        append_linked(&chain, issuance("F-1", 0));
        append_linked(&chain, issuance("F-2", 1));

        let mut summary = chain.export_range(&ts(0), &ts(10)).unwrap();
        summary.issuance_count = 1;

        assert!(matches!(
            chain.purge_exported(&summary),
            Err(PurgeError::SummaryMismatch { .. })
        ));
    }

    /// Under the per-system scope a time window can skip records of another
    /// system that were appended in between.  Such a summary does not cover
    /// the append-order prefix, so the purge is refused and nothing is lost;
    /// a window reaching the interleaved record purges normally.
    #[test]
    fn test_purge_across_interleaved_systems() {
        let mut other = issuance("G-1", 20);
        if let Record::Issuance(r) = &mut other {
            r.system = system("0002");
        }

        let chain = InMemoryRecordChain::new(ChainScope::PerSystem);
        append_linked(&chain, issuance("F-1", 0));
        append_linked(&chain, other);
        append_linked(&chain, issuance("F-2", 10));

        let partial = chain.export_range(&ts(0), &ts(15)).unwrap();
        assert_eq!(partial.issuance_count, 2);
        assert!(matches!(
            chain.purge_exported(&partial),
            Err(PurgeError::SummaryMismatch { .. })
        ));
        assert_eq!(chain.snapshot().len(), 3, "a rejected purge removes nothing");

        let whole = chain.export_range(&ts(0), &ts(30)).unwrap();
        chain.purge_exported(&whole).unwrap();
        let snapshot = chain.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.anchors.len(), 2, "one anchor per system");
    }

    /// A last record whose stored fingerprint no longer recomputes cannot
    /// become an anchor.
    #[test]
    fn test_purge_refuses_tampered_anchor() {
        let chain = InMemoryRecordChain::default();
        append_linked(&chain, issuance("F-1", 0));

        let mut summary = chain.export_range(&ts(0), &ts(10)).unwrap();
        {
            let mut state = chain.state.lock().unwrap();
            state.records[0].set_fingerprint("b".repeat(64));
        }
        summary.last.fingerprint = "b".repeat(64);
        summary.first.fingerprint = "b".repeat(64);

        assert!(matches!(
            chain.purge_exported(&summary),
            Err(PurgeError::AnchorLoss { .. })
        ));
    }

    /// Restoring a snapshot without tail bookkeeping links the next append
    /// to the last restored record.
    #[test]
    fn test_restore_rebuilds_tails() {
        let source = InMemoryRecordChain::default();
        append_linked(&source, issuance("F-1", 0));
        let last = append_linked(&source, issuance("F-2", 1));

        let mut backup = source.snapshot();
        backup.tails.clear();

        let restored = InMemoryRecordChain::default();
        restored.restore(backup).unwrap();

        let next = append_linked(&restored, issuance("F-3", 2));
        assert_eq!(next.chaining().previous_fingerprint(), Some(last.fingerprint()));
        assert_eq!(restored.verify(), Ok(()));
    }

    /// A backup keyed for another chaining scope is refused and the store
    /// keeps its chain, so no second first record can be appended.
    #[test]
    fn test_restore_refuses_foreign_scope() {
        let global = InMemoryRecordChain::new(ChainScope::Global);
        append_linked(&global, issuance("F-1", 0));

        let store = InMemoryRecordChain::new(ChainScope::PerSystem);
        append_linked(&store, issuance("F-9", 0));

        assert!(matches!(
            store.restore(global.snapshot()),
            Err(ChainError::ScopeMismatch { .. })
        ));
        assert_eq!(store.snapshot().len(), 1, "store must be unchanged");
        assert!(matches!(
            store.append(issuance("F-2", 1)),
            Err(ChainError::BrokenLink { .. })
        ));
    }

    // ── Event log ─────────────────────────────────────────────────────────────

    /// Events chain from the genesis sentinel and carry the payload's type.
    #[test]
    fn test_event_log_chains() {
        let log = ticking_log();

        let start = log.log_event(EventPayload::LifecycleStart, None).unwrap();
        let stop = log.log_event(EventPayload::LifecycleStop, Some("shutdown".to_string())).unwrap();

        assert!(start.chaining.is_first);
        assert_eq!(start.event_type, EventType::LifecycleStart);
        assert_eq!(stop.chaining.previous_fingerprint(), Some(start.fingerprint.as_str()));
        assert_eq!(stop.fingerprint, event_fingerprint(&stop));
        assert_eq!(stop.other_data.as_deref(), Some("shutdown"));
    }

    /// A log kept on the obligor's behalf names its keeper in every entry.
    #[test]
    fn test_event_commits_to_keeper() {
        let keeper = EventProducer {
            kept_by: Some(IssuedBy::ThirdParty),
            keeper: Some(Party::with_nif("Gestoria Ejemplo S.L.", "B11223344")),
            ..producer()
        };
        let own = InMemoryEventLog::with_clock(producer(), Box::new(|| ts(0)));
        let delegated = InMemoryEventLog::with_clock(keeper, Box::new(|| ts(0)));

        let a = own.log_event(EventPayload::LifecycleStart, None).unwrap();
        let b = delegated.log_event(EventPayload::LifecycleStart, None).unwrap();

        let canonical = canonical_event(&b);
        assert!(canonical.contains("&SystemId=SI&KeptBy=T&Keeper.Name=Gestoria Ejemplo S.L.&"));
        assert!(!canonical_event(&a).contains("KeptBy="));
        assert_ne!(a.fingerprint, b.fingerprint);
    }

    /// Free text is cut to its ceiling.
    #[test]
    fn test_event_other_data_truncated() {
        let log = ticking_log();
        let event = log.log_event(EventPayload::Other, Some("x".repeat(150))).unwrap();

        assert_eq!(event.other_data.unwrap().len(), 100);
    }

    /// A clock running backwards does not break date order.
    #[test]
    fn test_event_timestamps_never_decrease() {
        let tick = AtomicI64::new(10);
        let log = InMemoryEventLog::with_clock(
            producer(),
            Box::new(move || ts(tick.fetch_sub(1, Ordering::SeqCst))),
        );

        let a = log.log_event(EventPayload::LifecycleStart, None).unwrap();
        let b = log.log_event(EventPayload::LifecycleStop, None).unwrap();

        assert!(b.generated_at >= a.generated_at);
    }

    /// A tampered tail halts the log; every later call fails too.
    #[test]
    fn test_event_log_halts_on_corrupt_tail() {
        let log = ticking_log();
        log.log_event(EventPayload::LifecycleStart, None).unwrap();
        log.log_event(EventPayload::Other, Some("original".to_string())).unwrap();

        {
            let mut state = log.state.lock().unwrap();
            state.events[1].other_data = Some("rewritten".to_string());
        }

        assert!(log.log_event(EventPayload::LifecycleStop, None).is_err());
        assert!(log.is_halted());
        assert!(log.log_event(EventPayload::LifecycleStop, None).is_err());
        assert_eq!(log.snapshot().len(), 2, "a halted log accepts nothing");
    }

    /// The integrity check halts a corrupt log without appending to it.
    #[test]
    fn test_check_integrity_halts_corrupt_log() {
        let log = ticking_log();
        log.log_event(EventPayload::LifecycleStart, None).unwrap();
        assert_eq!(log.check_integrity(), Ok(()));

        {
            let mut state = log.state.lock().unwrap();
            state.events[0].fingerprint = "c".repeat(64);
        }

        assert!(log.check_integrity().is_err());
        assert!(log.is_halted());
        assert_eq!(log.snapshot().len(), 1);
    }

    /// Restoring a clean backup lifts the halt.
    #[test]
    fn test_event_log_restore_lifts_halt() {
        let log = ticking_log();
        log.log_event(EventPayload::LifecycleStart, None).unwrap();
        let backup = log.snapshot();

        {
            let mut state = log.state.lock().unwrap();
            state.events[0].fingerprint = "c".repeat(64);
        }
        assert!(log.log_event(EventPayload::Other, None).is_err());

        log.restore(backup).unwrap();
        assert!(!log.is_halted());
        assert!(log.log_event(EventPayload::BackupRestored, None).is_ok());
    }

    #[test]
    fn test_event_export_range() {
        let log = ticking_log();
        for _ in 0..5 {
            log.log_event(EventPayload::Other, None).unwrap();
        }

        let summary = log.export_range(&ts(1), &ts(3)).unwrap();

        assert_eq!(summary.event_count, 3);
        assert_eq!(summary.first.generated_at, ts(1));
        assert_eq!(summary.last.generated_at, ts(3));
        assert!(matches!(
            log.export_range(&ts(30), &ts(40)),
            Err(ExportError::EmptyRange { .. })
        ));
    }
}
