//! `ChainAnomalyScanner`: re-scans snapshots of the record chain and the
//! event log.
//!
//! Four checks, each toggled by `DetectorConfig` and each counted on its own:
//!
//! | Check               | Finding type                          |
//! |---------------------|---------------------------------------|
//! | fingerprint         | `01` fingerprint integrity            |
//! | signature           | `02` signature, `03` unknown signer   |
//! | chain traceability  | `04` not-first, `05` not-last, `06` other |
//! | date traceability   | `90` other                            |
//!
//! Record chain checks run per chaining scope, seeded from the purge anchors
//! so a truncated chain scans clean.  The scanner never writes anything; the
//! `Ledger` logs the report.

use std::collections::BTreeMap;

use tracing::{debug, info};
use uuid::Uuid;

use verichain_chain::hash::{canonical_event, canonical_record, event_fingerprint, record_fingerprint};
use verichain_contracts::{
    anomaly::{AnomalyFinding, CheckStats, DetectorConfig, IntegrityCheck, ScanReport, ScanStats},
    chain::ChainSnapshot,
    codes::AnomalyType,
    event::{EventRecord, EventSnapshot},
    format::format_timestamp,
    record::{ChainLink, Record, RecordRef},
};
use verichain_core::traits::{AnomalyScanner, SignatureCheck, SignatureVerifier};

/// Short form of a fingerprint for finding details.
fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

/// The reference `AnomalyScanner`.
pub struct ChainAnomalyScanner {
    config: DetectorConfig,
    verifier: Option<Box<dyn SignatureVerifier>>,
}

impl ChainAnomalyScanner {
    /// A scanner without a key store: the signature check is reported as
    /// not performed.
    pub fn new(config: DetectorConfig) -> Self {
        Self { config, verifier: None }
    }

    pub fn with_verifier(mut self, verifier: Box<dyn SignatureVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    fn signatures_enabled(&self) -> Option<&dyn SignatureVerifier> {
        if self.config.signatures {
            self.verifier.as_deref()
        } else {
            None
        }
    }

    // ── Record chain ──────────────────────────────────────────────────────────

    fn scan_records(&self, snapshot: &ChainSnapshot) -> (ScanStats, Vec<AnomalyFinding>) {
        let mut stats = ScanStats::default();
        let mut findings = Vec::new();
        let total = snapshot.len() as u64;

        if self.config.fingerprints {
            for record in &snapshot.records {
                let recomputed = record_fingerprint(record);
                if recomputed != record.fingerprint() {
                    findings.push(AnomalyFinding::new(
                        AnomalyType::FingerprintIntegrity,
                        IntegrityCheck::Fingerprint,
                        Some(record.invoice().clone()),
                        format!(
                            "stored {} != recomputed {}",
                            short(record.fingerprint()),
                            short(&recomputed)
                        ),
                    ));
                }
            }
            stats.fingerprints = CheckStats::ran(total);
        }

        if let Some(verifier) = self.signatures_enabled() {
            let mut processed = 0;
            for record in &snapshot.records {
                let Some(signature) = record.signature() else { continue };
                processed += 1;
                let signer = &record.system().producer_nif;
                let check = verifier.verify(signer, canonical_record(record).as_bytes(), signature);
                if let Some(finding) = signature_finding(check, signer, Some(record)) {
                    findings.push(finding);
                }
            }
            stats.signatures = CheckStats::ran(processed);
        }

        if self.config.chain {
            findings.extend(record_chain_findings(snapshot));
            stats.chain = CheckStats::ran(total);
        }

        if self.config.dates {
            findings.extend(record_date_findings(snapshot));
            stats.dates = CheckStats::ran(total);
        }

        (stats, findings)
    }

    // ── Event log ─────────────────────────────────────────────────────────────

    fn scan_events(&self, snapshot: &EventSnapshot) -> (ScanStats, Vec<AnomalyFinding>) {
        let mut stats = ScanStats::default();
        let mut findings = Vec::new();
        let events = &snapshot.events;
        let total = events.len() as u64;

        if self.config.fingerprints {
            for (i, event) in events.iter().enumerate() {
                let recomputed = event_fingerprint(event);
                if recomputed != event.fingerprint {
                    findings.push(AnomalyFinding::new(
                        AnomalyType::FingerprintIntegrity,
                        IntegrityCheck::Fingerprint,
                        None,
                        format!(
                            "event #{} ({}): stored {} != recomputed {}",
                            i,
                            event.event_type,
                            short(&event.fingerprint),
                            short(&recomputed)
                        ),
                    ));
                }
            }
            stats.fingerprints = CheckStats::ran(total);
        }

        if let Some(verifier) = self.signatures_enabled() {
            let mut processed = 0;
            for event in events {
                let Some(signature) = event.signature.as_deref() else { continue };
                processed += 1;
                let signer = &event.producer.obligor_nif;
                let check = verifier.verify(signer, canonical_event(event).as_bytes(), signature);
                if let Some(finding) = signature_finding(check, signer, None) {
                    findings.push(finding);
                }
            }
            stats.signatures = CheckStats::ran(processed);
        }

        if self.config.chain {
            findings.extend(event_chain_findings(events));
            stats.chain = CheckStats::ran(total);
        }

        if self.config.dates {
            for (i, pair) in events.windows(2).enumerate() {
                if pair[1].generated_at < pair[0].generated_at {
                    findings.push(AnomalyFinding::new(
                        AnomalyType::Other,
                        IntegrityCheck::DateTraceability,
                        None,
                        format!(
                            "event #{} at {} precedes event #{} at {}",
                            i + 1,
                            format_timestamp(&pair[1].generated_at),
                            i,
                            format_timestamp(&pair[0].generated_at)
                        ),
                    ));
                }
            }
            stats.dates = CheckStats::ran(total);
        }

        (stats, findings)
    }
}

fn signature_finding(
    check: SignatureCheck,
    signer: &str,
    record: Option<&Record>,
) -> Option<AnomalyFinding> {
    let invoice = record.map(|r| r.invoice().clone());
    match check {
        SignatureCheck::Valid => None,
        SignatureCheck::Invalid { reason } => Some(AnomalyFinding::new(
            AnomalyType::SignatureIntegrity,
            IntegrityCheck::Signature,
            invoice,
            reason,
        )),
        SignatureCheck::UnknownSigner => Some(AnomalyFinding::new(
            AnomalyType::IntegrityOther,
            IntegrityCheck::Signature,
            invoice,
            format!("no key registered for signer {}", signer),
        )),
    }
}

/// Describe where a link that missed its predecessor actually points.
fn describe_target(snapshot: &ChainSnapshot, target: &RecordRef) -> String {
    if let Some(position) = snapshot.position_of(target) {
        return format!("links to {} at position {}", target.invoice, position);
    }
    if snapshot.anchors.values().any(|a| &a.link == target) {
        return format!("links to purged anchor {}", target.invoice);
    }
    if snapshot.find(&target.invoice).is_empty() {
        format!("links to unknown record {}", target.invoice)
    } else {
        format!("links to {} with a stale fingerprint", target.invoice)
    }
}

fn record_chain_findings(snapshot: &ChainSnapshot) -> Vec<AnomalyFinding> {
    let mut findings = Vec::new();
    let mut predecessors: BTreeMap<String, RecordRef> = snapshot
        .anchors
        .iter()
        .map(|(key, anchor)| (key.clone(), anchor.link.clone()))
        .collect();

    for record in &snapshot.records {
        let key = snapshot.scope_key(record);
        let expected = predecessors.get(&key);
        let invoice = Some(record.invoice().clone());

        match record.chaining().link() {
            None => findings.push(AnomalyFinding::new(
                AnomalyType::ChainOther,
                IntegrityCheck::ChainTraceability,
                invoice,
                "chaining block must set exactly one of is_first and previous",
            )),
            Some(ChainLink::First) => {
                if let Some(expected) = expected {
                    findings.push(AnomalyFinding::new(
                        AnomalyType::ChainOther,
                        IntegrityCheck::ChainTraceability,
                        invoice,
                        format!("declares first but follows {}", expected.invoice),
                    ));
                }
            }
            Some(ChainLink::After(previous)) => {
                if Some(previous) != expected {
                    let predecessor = expected
                        .map(|e| e.invoice.to_string())
                        .unwrap_or_else(|| "none".to_string());
                    findings.push(AnomalyFinding::new(
                        AnomalyType::ChainNotFirst,
                        IntegrityCheck::ChainTraceability,
                        invoice,
                        format!(
                            "{}; predecessor is {}",
                            describe_target(snapshot, previous),
                            predecessor
                        ),
                    ));
                }
            }
        }

        predecessors.insert(key, record.to_ref());
    }

    // Tail bookkeeping must name the last record of each scope.  Snapshots
    // built without it are not checked.
    if !snapshot.tails.is_empty() {
        for (key, last) in &predecessors {
            match snapshot.tails.get(key) {
                Some(tail) if &tail.link == last => {}
                Some(tail) => findings.push(AnomalyFinding::new(
                    AnomalyType::ChainNotLast,
                    IntegrityCheck::ChainTraceability,
                    Some(tail.link.invoice.clone()),
                    format!("chain tail names {}, last record is {}", tail.link.invoice, last.invoice),
                )),
                None => findings.push(AnomalyFinding::new(
                    AnomalyType::ChainNotLast,
                    IntegrityCheck::ChainTraceability,
                    Some(last.invoice.clone()),
                    format!("scope {} has records but no chain tail", key),
                )),
            }
        }
    }

    findings
}

fn record_date_findings(snapshot: &ChainSnapshot) -> Vec<AnomalyFinding> {
    let mut findings = Vec::new();
    let mut latest: BTreeMap<String, _> = snapshot
        .anchors
        .iter()
        .map(|(key, anchor)| (key.clone(), anchor.generated_at))
        .collect();

    for record in &snapshot.records {
        let key = snapshot.scope_key(record);
        let at = *record.generated_at();
        if let Some(previous) = latest.get(&key) {
            if at < *previous {
                findings.push(AnomalyFinding::new(
                    AnomalyType::Other,
                    IntegrityCheck::DateTraceability,
                    Some(record.invoice().clone()),
                    format!(
                        "generated at {} before its predecessor at {}",
                        format_timestamp(&at),
                        format_timestamp(previous)
                    ),
                ));
            }
        }
        latest.insert(key, at);
    }

    findings
}

fn event_chain_findings(events: &[EventRecord]) -> Vec<AnomalyFinding> {
    let mut findings = Vec::new();

    for (i, event) in events.iter().enumerate() {
        let c = &event.chaining;
        let problem = if !c.is_well_formed() {
            Some((AnomalyType::ChainOther, "malformed chaining block".to_string()))
        } else if i == 0 {
            (!c.is_first).then(|| {
                (AnomalyType::ChainNotFirst, "first retained event declares a predecessor".to_string())
            })
        } else if c.is_first {
            Some((AnomalyType::ChainOther, "declares first but is not".to_string()))
        } else if c.previous.as_ref() != Some(&events[i - 1].to_ref()) {
            Some((AnomalyType::ChainNotFirst, "does not link to the preceding event".to_string()))
        } else {
            None
        };

        if let Some((anomaly, detail)) = problem {
            findings.push(AnomalyFinding::new(
                anomaly,
                IntegrityCheck::ChainTraceability,
                None,
                format!("event #{} ({}): {}", i, event.event_type, detail),
            ));
        }
    }

    findings
}

impl AnomalyScanner for ChainAnomalyScanner {
    fn scan(&self, records: &ChainSnapshot, events: &EventSnapshot) -> ScanReport {
        let scan_id = Uuid::new_v4();

        let (record_stats, record_findings) = self.scan_records(records);
        let (event_stats, event_findings) = if self.config.event_log {
            let (stats, findings) = self.scan_events(events);
            (Some(stats), findings)
        } else {
            (None, Vec::new())
        };

        debug!(
            scan_id = %scan_id,
            fingerprints = self.config.fingerprints,
            signatures = self.signatures_enabled().is_some(),
            chain = self.config.chain,
            dates = self.config.dates,
            "scan checks selected"
        );
        info!(
            scan_id = %scan_id,
            records = records.len(),
            events = events.len(),
            record_findings = record_findings.len(),
            event_findings = event_findings.len(),
            "scan finished"
        );

        ScanReport {
            scan_id,
            records: record_stats,
            record_findings,
            events: event_stats,
            event_findings,
        }
    }
}
