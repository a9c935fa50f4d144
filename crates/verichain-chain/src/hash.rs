//! Canonical forms and fingerprints.
//!
//! A record's canonical form is a sequence of `Name=value&` pairs in a fixed
//! field order.  Values are percent-escaped (`%`, `&` and `=` become `%25`,
//! `%26` and `%3D`) so free text can never forge a pair boundary, which
//! makes omitting absent optional fields unambiguous.  Decimals carry exactly
//! two fraction digits, dates are `dd-mm-yyyy` and timestamps RFC 3339 with
//! their offset.  Chaining, fingerprint and signature are excluded; the
//! previous fingerprint (or [`GENESIS_HASH`] on a first record) is the last
//! pair.
//!
//! The field order is part of the fingerprint format.  Reordering the writer
//! calls below changes every fingerprint ever produced.

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use verichain_contracts::{
    codes::HashAlgorithm,
    event::EventRecord,
    format::{format_amount, format_date, format_timestamp},
    record::{
        CancellationRecord, ForeignId, InvoiceId, IssuanceRecord, Party, Record, SystemInfo,
        TaxLine,
    },
};

/// The previous fingerprint of the first entry of every chain.
///
/// 64 hex zeros: a value no SHA-256 input is known to produce.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

// ── Canonical writer ──────────────────────────────────────────────────────────

struct CanonicalWriter {
    out: String,
}

impl CanonicalWriter {
    fn new() -> Self {
        Self { out: String::with_capacity(512) }
    }

    fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.out.push_str(name);
        self.out.push('=');
        for c in value.chars() {
            match c {
                '%' => self.out.push_str("%25"),
                '&' => self.out.push_str("%26"),
                '=' => self.out.push_str("%3D"),
                c => self.out.push(c),
            }
        }
        self.out.push('&');
        self
    }

    fn opt_text(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.text(name, v);
        }
        self
    }

    fn code(&mut self, name: &str, value: &str) -> &mut Self {
        self.text(name, value)
    }

    fn flag(&mut self, name: &str, value: bool) -> &mut Self {
        self.text(name, if value { "S" } else { "N" })
    }

    fn amount(&mut self, name: &str, value: Decimal) -> &mut Self {
        self.text(name, &format_amount(value))
    }

    fn opt_amount(&mut self, name: &str, value: Option<Decimal>) -> &mut Self {
        if let Some(v) = value {
            self.amount(name, v);
        }
        self
    }

    fn date(&mut self, name: &str, value: NaiveDate) -> &mut Self {
        self.text(name, &format_date(value))
    }

    fn timestamp(&mut self, name: &str, value: &DateTime<FixedOffset>) -> &mut Self {
        self.text(name, &format_timestamp(value))
    }

    fn invoice(&mut self, prefix: &str, id: &InvoiceId) -> &mut Self {
        self.text(&format!("{prefix}IssuerId"), &id.issuer_id)
            .text(&format!("{prefix}SeriesNumber"), &id.series_number)
            .date(&format!("{prefix}IssueDate"), id.issue_date)
    }

    fn party(&mut self, prefix: &str, party: &Party) -> &mut Self {
        self.text(&format!("{prefix}Name"), &party.name)
            .opt_text(&format!("{prefix}Nif"), party.nif.as_deref());
        if let Some(foreign) = &party.foreign_id {
            self.foreign_id(prefix, foreign);
        }
        self
    }

    fn foreign_id(&mut self, prefix: &str, id: &ForeignId) -> &mut Self {
        self.text(&format!("{prefix}CountryCode"), &id.country_code)
            .code(&format!("{prefix}IdType"), id.id_type.code())
            .text(&format!("{prefix}Id"), &id.id)
    }

    fn system(&mut self, system: &SystemInfo) -> &mut Self {
        self.text("ProducerName", &system.producer_name)
            .text("ProducerNif", &system.producer_nif);
        if let Some(other) = &system.other_id {
            self.foreign_id("Producer", other);
        }
        self.text("SystemName", &system.system_name)
            .text("SystemId", &system.system_id)
            .text("SystemVersion", &system.version)
            .text("InstallationNumber", &system.installation_number)
            .flag("VerifactuOnly", system.verifactu_only)
            .flag("MultiTaxpayerCapable", system.multi_taxpayer_capable)
            .flag("MultipleTaxpayers", system.multiple_taxpayers)
    }

    fn tax_line(&mut self, i: usize, line: &TaxLine) -> &mut Self {
        let name = |field: &str| format!("Breakdown[{i}].{field}");
        self.opt_text(&name("Tax"), line.tax.map(|t| t.code()))
            .code(&name("Regime"), line.regime.code())
            .code(&name("Qualification"), line.qualification.code())
            .opt_text(&name("Exemption"), line.exemption.map(|e| e.code()))
            .opt_amount(&name("Rate"), line.rate)
            .amount(&name("TaxableBase"), line.taxable_base)
            .opt_amount(&name("TaxableBaseAtCost"), line.taxable_base_at_cost)
            .opt_amount(&name("TaxAmount"), line.tax_amount)
            .opt_amount(&name("SurchargeRate"), line.surcharge_rate)
            .opt_amount(&name("SurchargeAmount"), line.surcharge_amount)
    }

    fn finish(mut self, previous: Option<&str>) -> String {
        self.text("PreviousFingerprint", previous.unwrap_or(GENESIS_HASH));
        self.out
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

fn write_issuance(w: &mut CanonicalWriter, r: &IssuanceRecord) {
    w.text("Kind", "issuance")
        .text("Version", &r.version)
        .invoice("", &r.invoice)
        .opt_text("ExternalRef", r.external_ref.as_deref())
        .text("IssuerName", &r.issuer_name)
        .flag("Remedy", r.remedy)
        .flag("PreviousRejection", r.previous_rejection)
        .code("InvoiceType", r.invoice_type.code())
        .opt_text("RectificationType", r.rectification_type.map(|t| t.code()));

    for (i, id) in r.rectified_invoices.iter().flatten().enumerate() {
        w.invoice(&format!("Rectified[{i}]."), id);
    }
    for (i, id) in r.substituted_invoices.iter().flatten().enumerate() {
        w.invoice(&format!("Substituted[{i}]."), id);
    }
    if let Some(amount) = &r.rectification_amount {
        w.amount("RectifiedBase", amount.base)
            .amount("RectifiedTax", amount.tax)
            .opt_amount("RectifiedSurcharge", amount.surcharge);
    }
    if let Some(date) = r.operation_date {
        w.date("OperationDate", date);
    }

    w.text("Description", &r.description)
        .flag("SimplifiedArt7273", r.simplified_art_7273)
        .flag("NoRecipientArt61d", r.no_recipient_art_61d)
        .flag("Macrodata", r.macrodata)
        .opt_text("IssuedBy", r.issued_by.map(|b| b.code()));
    if let Some(third_party) = &r.third_party {
        w.party("ThirdParty.", third_party);
    }
    for (i, recipient) in r.recipients.iter().flatten().enumerate() {
        w.party(&format!("Recipient[{i}]."), recipient);
    }

    w.flag("Coupon", r.coupon);
    for (i, line) in r.breakdown.iter().enumerate() {
        w.tax_line(i, line);
    }

    w.amount("TaxTotal", r.tax_total)
        .amount("GrossTotal", r.gross_total)
        .system(&r.system)
        .timestamp("GeneratedAt", &r.generated_at)
        .opt_text("AgreementRegistration", r.agreement_registration.as_deref())
        .opt_text("SystemAgreementId", r.system_agreement_id.as_deref())
        .code("Algorithm", r.algorithm.code());
}

fn write_cancellation(w: &mut CanonicalWriter, r: &CancellationRecord) {
    w.text("Kind", "cancellation")
        .text("Version", &r.version)
        .invoice("", &r.invoice)
        .opt_text("ExternalRef", r.external_ref.as_deref())
        .flag("NoPriorRecord", r.no_prior_record)
        .flag("PreviousRejection", r.previous_rejection)
        .opt_text("GeneratedBy", r.generated_by.map(|g| g.code()));
    if let Some(generator) = &r.generator {
        w.party("Generator.", generator);
    }
    w.system(&r.system)
        .timestamp("GeneratedAt", &r.generated_at)
        .code("Algorithm", r.algorithm.code());
}

/// The canonical form of `record`, linked to the previous fingerprint its
/// own chaining block declares.
pub fn canonical_record(record: &Record) -> String {
    let mut w = CanonicalWriter::new();
    match record {
        Record::Issuance(r) => write_issuance(&mut w, r),
        Record::Cancellation(r) => write_cancellation(&mut w, r),
    }
    w.finish(record.chaining().previous_fingerprint())
}

/// Digest `input` with `algorithm`, as lowercase hex.
pub fn digest(algorithm: HashAlgorithm, input: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(input)),
    }
}

/// Fingerprint of `record` under its declared algorithm.
///
/// A pure function of the canonical form: the stored fingerprint and
/// signature of `record` do not contribute.
pub fn record_fingerprint(record: &Record) -> String {
    digest(record.algorithm(), canonical_record(record).as_bytes())
}

// ── Events ────────────────────────────────────────────────────────────────────

/// The canonical form of an event log entry.
///
/// The payload is rendered as compact JSON.
///
/// # Panics
///
/// Panics if the payload cannot be serialized to JSON, which cannot happen
/// for `EventPayload`: every variant holds plain data with string map keys.
pub fn canonical_event(event: &EventRecord) -> String {
    let payload = serde_json::to_string(&event.payload)
        .expect("EventPayload must always be serializable to JSON");

    let mut w = CanonicalWriter::new();
    w.text("Version", &event.version)
        .text("ObligorName", &event.producer.obligor_name)
        .text("ObligorNif", &event.producer.obligor_nif)
        .text("SystemId", &event.producer.system_id)
        .opt_text("KeptBy", event.producer.kept_by.map(|k| k.code()));
    if let Some(keeper) = &event.producer.keeper {
        w.party("Keeper.", keeper);
    }
    w.timestamp("GeneratedAt", &event.generated_at)
        .code("EventType", event.event_type.code())
        .text("Payload", &payload)
        .opt_text("OtherData", event.other_data.as_deref())
        .code("Algorithm", event.algorithm.code());
    w.finish(event.chaining.previous_fingerprint())
}

pub fn event_fingerprint(event: &EventRecord) -> String {
    digest(event.algorithm, canonical_event(event).as_bytes())
}
