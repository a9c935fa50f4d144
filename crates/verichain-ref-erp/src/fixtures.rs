//! Example invoice data for the VERICHAIN reference runtime.
//!
//! All data in this module is fictional: the issuer "Empresa Ejemplo S.L.",
//! its customer and the invoicing software are stand-ins for a real ERP.
//! `example_issuance` and `example_cancellation` are the canonical pair used
//! throughout the scenarios and tests.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use ed25519_dalek::SigningKey;
use rust_decimal::Decimal;

use verichain_chain::events::Clock;
use verichain_contracts::{
    codes::{GeneratedBy, HashAlgorithm, InvoiceType, OperationQualification, RegimeKey, TaxType},
    record::{
        CancellationRecord, Chaining, InvoiceId, IssuanceRecord, Party, Record, SystemInfo,
        TaxLine,
    },
};
use verichain_detect::Ed25519KeyStore;

// ── Parties ───────────────────────────────────────────────────────────────────

pub const ISSUER_NIF: &str = "B12345678";
pub const ISSUER_NAME: &str = "Empresa Ejemplo S.L.";
pub const CUSTOMER_NIF: &str = "A87654321";
pub const CUSTOMER_NAME: &str = "Cliente Ejemplo S.A.";
/// Tax ID of the software producer; records are signed under this key.
pub const PRODUCER_NIF: &str = "B99999999";

/// Seed of the producer's fixture signing key.
const SIGNING_SEED: [u8; 32] = *b"verichain-erp-fixture-signing-k1";

pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&SIGNING_SEED)
}

/// A key store holding the producer's verifying key.
pub fn key_store() -> Ed25519KeyStore {
    let mut keys = Ed25519KeyStore::new();
    keys.register(PRODUCER_NIF, signing_key().verifying_key());
    keys
}

pub fn system_info() -> SystemInfo {
    SystemInfo {
        producer_name: "Software Ejemplo S.L.".to_string(),
        producer_nif: PRODUCER_NIF.to_string(),
        other_id: None,
        system_name: "ERP-CRM Facturacion".to_string(),
        system_id: "01".to_string(),
        version: "1.0".to_string(),
        installation_number: "SI001".to_string(),
        verifactu_only: true,
        multi_taxpayer_capable: false,
        multiple_taxpayers: false,
    }
}

// ── Time ──────────────────────────────────────────────────────────────────────

/// A UTC timestamp with an explicit `+00:00` offset.
///
/// # Panics
///
/// Panics on an impossible calendar date; fixture dates are constants.
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("fixture timestamp must be a valid UTC instant")
        .fixed_offset()
}

/// # Panics
///
/// Panics on an impossible calendar date.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("fixture date must be valid")
}

/// An event log clock that starts at `start` and advances one second per
/// reading, so scenario runs are reproducible.
pub fn simulated_clock(start: DateTime<FixedOffset>) -> Clock {
    let ticks = AtomicI64::new(0);
    Box::new(move || start + Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst)))
}

// ── Records ───────────────────────────────────────────────────────────────────

/// The example issuance: invoice FACT2024-001 for 1000.00 plus 21% VAT.
pub fn example_issuance() -> IssuanceRecord {
    IssuanceRecord {
        version: "1.0".to_string(),
        invoice: InvoiceId::new(ISSUER_NIF, "FACT2024-001", date(2024, 2, 14)),
        external_ref: None,
        issuer_name: ISSUER_NAME.to_string(),
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
        recipients: Some(vec![Party::with_nif(CUSTOMER_NAME, CUSTOMER_NIF)]),
        coupon: false,
        breakdown: vec![vat_line(Decimal::new(100000, 2))],
        tax_total: Decimal::new(21000, 2),
        gross_total: Decimal::new(121000, 2),
        chaining: Chaining::first(),
        system: system_info(),
        generated_at: utc(2024, 2, 14, 10, 30),
        agreement_registration: None,
        system_agreement_id: None,
        algorithm: HashAlgorithm::Sha256,
        fingerprint: String::new(),
        signature: None,
    }
}

/// The example cancellation of FACT2024-001, one hour after its issuance.
pub fn example_cancellation() -> CancellationRecord {
    CancellationRecord {
        version: "1.0".to_string(),
        invoice: InvoiceId::new(ISSUER_NIF, "FACT2024-001", date(2024, 2, 14)),
        external_ref: Some("ANUL2024-001".to_string()),
        no_prior_record: false,
        previous_rejection: false,
        generated_by: Some(GeneratedBy::Issuer),
        generator: Some(Party::with_nif(ISSUER_NAME, ISSUER_NIF)),
        chaining: Chaining::first(),
        system: system_info(),
        generated_at: utc(2024, 2, 14, 11, 30),
        algorithm: HashAlgorithm::Sha256,
        fingerprint: String::new(),
        signature: None,
    }
}

/// One general-regime VAT line at 21%.
pub fn vat_line(base: Decimal) -> TaxLine {
    let rate = Decimal::new(2100, 2);
    TaxLine {
        tax: Some(TaxType::Iva),
        regime: RegimeKey::General,
        qualification: OperationQualification::SubjectNotExempt,
        exemption: None,
        rate: Some(rate),
        taxable_base: base,
        taxable_base_at_cost: None,
        tax_amount: Some(vat(base)),
        surcharge_rate: None,
        surcharge_amount: None,
    }
}

fn vat(base: Decimal) -> Decimal {
    (base * Decimal::new(21, 2)).round_dp(2)
}

/// An unchained 21% VAT invoice for `base`, issued and generated at
/// `generated_at`.
pub fn invoice(series: &str, base: Decimal, generated_at: DateTime<FixedOffset>) -> Record {
    let tax = vat(base);
    Record::Issuance(IssuanceRecord {
        invoice: InvoiceId::new(ISSUER_NIF, series, generated_at.date_naive()),
        breakdown: vec![vat_line(base)],
        tax_total: tax,
        gross_total: base + tax,
        generated_at,
        ..example_issuance()
    })
}
