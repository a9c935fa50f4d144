//! `RecordSchemaValidator`: field-by-field validation of candidate records.
//!
//! Checks run in declaration order of the record fields and the first
//! violation is returned.  Enumerated fields are typed, so membership is
//! already enforced at deserialization; what remains here are lengths,
//! cardinalities, precisions, field combinations and the chaining block.

use rust_decimal::Decimal;
use tracing::debug;

use verichain_contracts::{
    chain::Anchor,
    codes::{HashAlgorithm, IssuedBy},
    error::ValidationError,
    record::{
        CancellationRecord, ChainLink, Chaining, ForeignId, InvoiceId, IssuanceRecord, Party,
        RectificationAmount, Record, SystemInfo, TaxLine,
    },
    submission::{SubmissionBatch, SubmissionHeader, Taxpayer},
};
use verichain_core::traits::RecordValidator;

use crate::limits::*;

type Check = Result<(), ValidationError>;

/// A `RecordValidator` enforcing the record model's structural rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordSchemaValidator;

impl RecordSchemaValidator {
    pub fn new() -> Self {
        Self
    }

    fn validate_issuance(&self, r: &IssuanceRecord, prior: Option<&Anchor>) -> Check {
        required("version", &r.version, VERSION_MAX)?;
        invoice_id("invoice", &r.invoice)?;
        optional("external_ref", r.external_ref.as_deref(), EXTERNAL_REF_MAX)?;
        required("issuer_name", &r.issuer_name, NAME_MAX)?;

        if !r.remedy && r.previous_rejection {
            return Err(ValidationError::Inconsistent {
                reason: "a previously rejected issuance must be submitted as a remedy".to_string(),
            });
        }

        match (r.invoice_type.is_rectifying(), r.rectification_type) {
            (true, None) => {
                return Err(ValidationError::Inconsistent {
                    reason: format!(
                        "invoice type {} requires a rectification type",
                        r.invoice_type
                    ),
                })
            }
            (false, Some(_)) => {
                return Err(ValidationError::Inconsistent {
                    reason: format!(
                        "invoice type {} does not take a rectification type",
                        r.invoice_type
                    ),
                })
            }
            _ => {}
        }

        if let Some(list) = &r.rectified_invoices {
            invoice_list("rectified_invoices", list)?;
        }
        if let Some(list) = &r.substituted_invoices {
            invoice_list("substituted_invoices", list)?;
        }
        if let Some(amount) = &r.rectification_amount {
            rectification_amount(amount)?;
        }

        required("description", &r.description, DESCRIPTION_MAX)?;

        if r.issued_by == Some(IssuedBy::ThirdParty) && r.third_party.is_none() {
            return Err(ValidationError::Inconsistent {
                reason: "an invoice issued by a third party must identify it".to_string(),
            });
        }
        if let Some(third_party) = &r.third_party {
            party("third_party", third_party)?;
        }

        if let Some(recipients) = &r.recipients {
            cardinality("recipients", recipients.len(), INVOICE_LIST_MIN, INVOICE_LIST_MAX)?;
            for (i, recipient) in recipients.iter().enumerate() {
                party(&format!("recipients[{i}]"), recipient)?;
            }
        }

        cardinality("breakdown", r.breakdown.len(), BREAKDOWN_MIN, BREAKDOWN_MAX)?;
        for (i, line) in r.breakdown.iter().enumerate() {
            tax_line(i, line)?;
        }

        amount("tax_total", r.tax_total)?;
        amount("gross_total", r.gross_total)?;

        chaining(&r.chaining, prior)?;
        system("system", &r.system)?;

        optional(
            "agreement_registration",
            r.agreement_registration.as_deref(),
            AGREEMENT_REGISTRATION_MAX,
        )?;
        optional(
            "system_agreement_id",
            r.system_agreement_id.as_deref(),
            SYSTEM_AGREEMENT_ID_MAX,
        )?;

        fingerprint(&r.fingerprint, r.algorithm)
    }

    fn validate_cancellation(&self, r: &CancellationRecord, prior: Option<&Anchor>) -> Check {
        required("version", &r.version, VERSION_MAX)?;
        invoice_id("invoice", &r.invoice)?;
        optional("external_ref", r.external_ref.as_deref(), EXTERNAL_REF_MAX)?;

        if r.generated_by.is_some() && r.generator.is_none() {
            return Err(ValidationError::Inconsistent {
                reason: "a cancellation with generated_by must identify the generator".to_string(),
            });
        }
        if let Some(generator) = &r.generator {
            party("generator", generator)?;
        }

        chaining(&r.chaining, prior)?;
        system("system", &r.system)?;

        fingerprint(&r.fingerprint, r.algorithm)
    }
}

impl RecordValidator for RecordSchemaValidator {
    fn validate(&self, record: &Record, prior: Option<&Anchor>) -> Result<(), ValidationError> {
        let result = match record {
            Record::Issuance(r) => self.validate_issuance(r, prior),
            Record::Cancellation(r) => self.validate_cancellation(r, prior),
        };

        debug!(
            invoice = %record.invoice(),
            kind = %record.kind(),
            passed = result.is_ok(),
            "record validation complete"
        );

        result
    }

    fn validate_batch(&self, batch: &SubmissionBatch) -> Result<(), ValidationError> {
        let result = submission(batch);

        debug!(
            obligor = %batch.header.obligor.nif,
            records = batch.records.len(),
            passed = result.is_ok(),
            "batch validation complete"
        );

        result
    }
}

// ── Submissions ───────────────────────────────────────────────────────────────

fn submission(batch: &SubmissionBatch) -> Check {
    header(&batch.header)?;
    cardinality("records", batch.records.len(), BATCH_MIN, BATCH_MAX)?;

    let obligor = &batch.header.obligor.nif;
    for (i, record) in batch.records.iter().enumerate() {
        let issuer = &record.invoice().issuer_id;
        if issuer != obligor {
            return Err(ValidationError::Inconsistent {
                reason: format!(
                    "records[{i}] is issued by {issuer}, the batch obligor is {obligor}"
                ),
            });
        }
    }
    Ok(())
}

fn header(h: &SubmissionHeader) -> Check {
    taxpayer("header.obligor", &h.obligor)?;
    if let Some(representative) = &h.representative {
        taxpayer("header.representative", representative)?;
    }
    if h.voluntary.is_some() && h.requirement.is_some() {
        return Err(ValidationError::Inconsistent {
            reason: "a submission is either voluntary or answers a requirement".to_string(),
        });
    }
    if let Some(requirement) = &h.requirement {
        required(
            "header.requirement.reference",
            &requirement.reference,
            REQUIREMENT_REF_MAX,
        )?;
    }
    Ok(())
}

fn taxpayer(field: &str, t: &Taxpayer) -> Check {
    required(&format!("{field}.name"), &t.name, NAME_MAX)?;
    required(&format!("{field}.nif"), &t.nif, NIF_MAX)
}

// ── Field checks ──────────────────────────────────────────────────────────────

fn required(field: &str, value: &str, max: usize) -> Check {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field: field.to_string() });
    }
    max_len(field, value, max)
}

fn optional(field: &str, value: Option<&str>, max: usize) -> Check {
    match value {
        Some(v) => max_len(field, v, max),
        None => Ok(()),
    }
}

fn max_len(field: &str, value: &str, max: usize) -> Check {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field: field.to_string(), max, actual });
    }
    Ok(())
}

fn cardinality(field: &str, actual: usize, min: usize, max: usize) -> Check {
    if actual < min || actual > max {
        return Err(ValidationError::Cardinality { field: field.to_string(), min, max, actual });
    }
    Ok(())
}

fn decimal(field: &str, value: Decimal, integer_digits: u32) -> Check {
    let fraction_ok = value.normalize().scale() <= FRACTION_DIGITS;
    let ceiling = Decimal::from(10u64.pow(integer_digits));
    let integer_ok = value.abs().trunc() < ceiling;

    if fraction_ok && integer_ok {
        Ok(())
    } else {
        Err(ValidationError::Precision {
            field: field.to_string(),
            value: value.to_string(),
            integer_digits,
            fraction_digits: FRACTION_DIGITS,
        })
    }
}

fn amount(field: &str, value: Decimal) -> Check {
    decimal(field, value, AMOUNT_INTEGER_DIGITS)
}

fn rate(field: &str, value: Decimal) -> Check {
    decimal(field, value, RATE_INTEGER_DIGITS)
}

fn invoice_id(field: &str, id: &InvoiceId) -> Check {
    required(&format!("{field}.issuer_id"), &id.issuer_id, NIF_MAX)?;
    required(&format!("{field}.series_number"), &id.series_number, SERIES_NUMBER_MAX)
}

fn invoice_list(field: &str, list: &[InvoiceId]) -> Check {
    cardinality(field, list.len(), INVOICE_LIST_MIN, INVOICE_LIST_MAX)?;
    for (i, id) in list.iter().enumerate() {
        invoice_id(&format!("{field}[{i}]"), id)?;
    }
    Ok(())
}

fn rectification_amount(a: &RectificationAmount) -> Check {
    amount("rectification_amount.base", a.base)?;
    amount("rectification_amount.tax", a.tax)?;
    if let Some(surcharge) = a.surcharge {
        amount("rectification_amount.surcharge", surcharge)?;
    }
    Ok(())
}

/// A party is identified by exactly one of a NIF or a foreign identifier.
fn party(field: &str, p: &Party) -> Check {
    required(&format!("{field}.name"), &p.name, NAME_MAX)?;
    match (&p.nif, &p.foreign_id) {
        (None, None) => {
            return Err(ValidationError::MissingField { field: format!("{field}.nif") });
        }
        (Some(_), Some(_)) => {
            return Err(ValidationError::Inconsistent {
                reason: format!("{field} carries both a nif and a foreign_id"),
            });
        }
        _ => {}
    }
    optional(&format!("{field}.nif"), p.nif.as_deref(), NIF_MAX)?;
    if let Some(foreign) = &p.foreign_id {
        foreign_id(&format!("{field}.foreign_id"), foreign)?;
    }
    Ok(())
}

fn foreign_id(field: &str, id: &ForeignId) -> Check {
    let code = &id.country_code;
    if code.len() != COUNTRY_CODE_LEN || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: format!("{field}.country_code"),
            reason: format!("'{code}' is not an ISO 3166-1 alpha-2 code"),
        });
    }
    required(&format!("{field}.id"), &id.id, FOREIGN_ID_MAX)
}

fn tax_line(i: usize, line: &TaxLine) -> Check {
    let field = |name: &str| format!("breakdown[{i}].{name}");

    if let Some(v) = line.rate {
        rate(&field("rate"), v)?;
    }
    amount(&field("taxable_base"), line.taxable_base)?;
    if let Some(v) = line.taxable_base_at_cost {
        amount(&field("taxable_base_at_cost"), v)?;
    }
    if let Some(v) = line.tax_amount {
        amount(&field("tax_amount"), v)?;
    }
    if let Some(v) = line.surcharge_rate {
        rate(&field("surcharge_rate"), v)?;
    }
    if let Some(v) = line.surcharge_amount {
        amount(&field("surcharge_amount"), v)?;
    }
    Ok(())
}

fn system(field: &str, s: &SystemInfo) -> Check {
    required(&format!("{field}.producer_name"), &s.producer_name, NAME_MAX)?;
    required(&format!("{field}.producer_nif"), &s.producer_nif, NIF_MAX)?;
    if let Some(other) = &s.other_id {
        foreign_id(&format!("{field}.other_id"), other)?;
    }
    required(&format!("{field}.system_name"), &s.system_name, SYSTEM_NAME_MAX)?;
    required(&format!("{field}.system_id"), &s.system_id, SYSTEM_ID_MAX)?;
    required(&format!("{field}.version"), &s.version, SYSTEM_VERSION_MAX)?;
    required(
        &format!("{field}.installation_number"),
        &s.installation_number,
        INSTALLATION_NUMBER_MAX,
    )
}

fn chaining(c: &Chaining, prior: Option<&Anchor>) -> Check {
    match c.link() {
        None if c.is_first => Err(ValidationError::MalformedChaining {
            reason: "a first record must not declare a previous record".to_string(),
        }),
        None => Err(ValidationError::MalformedChaining {
            reason: "a record that is not first must declare its previous record".to_string(),
        }),
        Some(ChainLink::First) => Ok(()),
        Some(ChainLink::After(previous)) => {
            invoice_id("chaining.previous.invoice", &previous.invoice)?;
            required("chaining.previous.fingerprint", &previous.fingerprint, FINGERPRINT_MAX)?;
            // A fingerprint that differs from the tail is a broken link, which
            // the chain reports at append time.  Only a link carrying the
            // tail's fingerprint under another invoice's identity is a
            // malformed candidate.
            match prior {
                Some(prior)
                    if prior.link.fingerprint == previous.fingerprint
                        && prior.link.invoice != previous.invoice =>
                {
                    Err(ValidationError::PreviousMismatch {
                        declared: previous.invoice.to_string(),
                        prior: prior.link.invoice.to_string(),
                    })
                }
                _ => Ok(()),
            }
        }
    }
}

/// A candidate may leave the fingerprint empty; a filled one must have the
/// algorithm's length and be lowercase hex.
fn fingerprint(value: &str, algorithm: HashAlgorithm) -> Check {
    if value.is_empty() {
        return Ok(());
    }
    let well_formed = value.len() == algorithm.hex_len()
        && value.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "fingerprint".to_string(),
            reason: format!(
                "expected {} lowercase hex characters for algorithm {}",
                algorithm.hex_len(),
                algorithm
            ),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};
    use rust_decimal_macros::dec;

    use verichain_contracts::{
        chain::Anchor,
        codes::{
            GeneratedBy, HashAlgorithm, IdType, InvoiceType, IssuedBy, OperationQualification,
            RectificationType, RegimeKey, TaxType,
        },
        error::ValidationError,
        record::{
            CancellationRecord, Chaining, ForeignId, InvoiceId, IssuanceRecord, Party, Record,
            RecordRef, SystemInfo, TaxLine,
        },
        submission::{
            RequirementSubmission, SubmissionBatch, SubmissionHeader, Taxpayer,
            VoluntarySubmission,
        },
    };
    use verichain_core::traits::RecordValidator;

    use super::RecordSchemaValidator;

    // ── Builder helpers ───────────────────────────────────────────────────────

    fn invoice(series: &str) -> InvoiceId {
        InvoiceId::new("B12345678", series, NaiveDate::from_ymd_opt(2024, 2, 14).unwrap())
    }

    fn system() -> SystemInfo {
        SystemInfo {
            producer_name: "Software Ejemplo S.L.".to_string(),
            producer_nif: "B99999999".to_string(),
            other_id: None,
            system_name: "Facturador".to_string(),
            system_id: "SI".to_string(),
            version: "1.0".to_string(),
            installation_number: "0001".to_string(),
            verifactu_only: true,
            multi_taxpayer_capable: false,
            multiple_taxpayers: false,
        }
    }

    fn line() -> TaxLine {
        TaxLine {
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
        }
    }

    fn issuance() -> IssuanceRecord {
        IssuanceRecord {
            version: "1.0".to_string(),
            invoice: invoice("FACT2024-001"),
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
            breakdown: vec![line()],
            tax_total: dec!(210.00),
            gross_total: dec!(1210.00),
            chaining: Chaining::first(),
            system: system(),
            generated_at: DateTime::parse_from_rfc3339("2024-02-14T10:30:00+01:00").unwrap(),
            agreement_registration: None,
            system_agreement_id: None,
            algorithm: HashAlgorithm::Sha256,
            fingerprint: String::new(),
            signature: None,
        }
    }

    fn cancellation() -> CancellationRecord {
        CancellationRecord {
            version: "1.0".to_string(),
            invoice: invoice("FACT2024-001"),
            external_ref: Some("ANUL2024-001".to_string()),
            no_prior_record: false,
            previous_rejection: false,
            generated_by: Some(GeneratedBy::Issuer),
            generator: Some(Party::with_nif("Empresa Ejemplo S.L.", "B12345678")),
            chaining: Chaining::first(),
            system: system(),
            generated_at: DateTime::parse_from_rfc3339("2024-02-14T11:30:00+01:00").unwrap(),
            algorithm: HashAlgorithm::Sha256,
            fingerprint: String::new(),
            signature: None,
        }
    }

    fn validate(record: impl Into<Record>) -> Result<(), ValidationError> {
        RecordSchemaValidator::new().validate(&record.into(), None)
    }

    fn prior(series: &str) -> Anchor {
        Anchor {
            link: RecordRef { invoice: invoice(series), fingerprint: "a".repeat(64) },
            generated_at: DateTime::parse_from_rfc3339("2024-02-14T09:00:00+01:00").unwrap(),
        }
    }

    // ── Well-formed records ───────────────────────────────────────────────────

    #[test]
    fn test_valid_issuance_passes() {
        assert_eq!(validate(issuance()), Ok(()));
    }

    #[test]
    fn test_valid_cancellation_passes() {
        assert_eq!(validate(cancellation()), Ok(()));
    }

    // ── Presence and length ───────────────────────────────────────────────────

    #[test]
    fn test_missing_description() {
        let mut r = issuance();
        r.description = "   ".to_string();

        assert_eq!(
            validate(r),
            Err(ValidationError::MissingField { field: "description".to_string() })
        );
    }

    #[test]
    fn test_issuer_id_too_long() {
        let mut r = issuance();
        r.invoice.issuer_id = "B123456789".to_string();

        assert_eq!(
            validate(r),
            Err(ValidationError::TooLong {
                field: "invoice.issuer_id".to_string(),
                max: 9,
                actual: 10,
            })
        );
    }

    #[test]
    fn test_description_ceiling_counts_characters() {
        let mut r = issuance();
        r.description = "ñ".repeat(500);
        assert_eq!(validate(r.clone()), Ok(()), "500 multi-byte chars fit");

        r.description.push('ñ');
        assert!(matches!(validate(r), Err(ValidationError::TooLong { max: 500, .. })));
    }

    // ── Cardinality ───────────────────────────────────────────────────────────

    #[test]
    fn test_breakdown_bounds() {
        let mut r = issuance();
        r.breakdown.clear();
        assert!(matches!(
            validate(r.clone()),
            Err(ValidationError::Cardinality { actual: 0, min: 1, max: 12, .. })
        ));

        r.breakdown = vec![line(); 13];
        assert!(matches!(
            validate(r.clone()),
            Err(ValidationError::Cardinality { actual: 13, .. })
        ));

        r.breakdown = vec![line(); 12];
        assert_eq!(validate(r), Ok(()));
    }

    #[test]
    fn test_present_invoice_list_must_not_be_empty() {
        let mut r = issuance();
        r.invoice_type = InvoiceType::Rectifying1;
        r.rectification_type = Some(RectificationType::Differences);
        r.rectified_invoices = Some(vec![]);

        match validate(r) {
            Err(ValidationError::Cardinality { field, min, max, actual }) => {
                assert_eq!(field, "rectified_invoices");
                assert_eq!((min, max, actual), (1, 1000, 0));
            }
            other => panic!("expected Cardinality, got {:?}", other),
        }
    }

    // ── Precision ─────────────────────────────────────────────────────────────

    #[test]
    fn test_amount_with_three_fraction_digits() {
        let mut r = issuance();
        r.breakdown[0].tax_amount = Some(dec!(210.005));

        match validate(r) {
            Err(ValidationError::Precision { field, .. }) => {
                assert_eq!(field, "breakdown[0].tax_amount");
            }
            other => panic!("expected Precision, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_precision() {
        let mut r = issuance();
        r.gross_total = dec!(1210.000);
        assert_eq!(validate(r), Ok(()));
    }

    #[test]
    fn test_integer_digit_ceilings() {
        let mut r = issuance();
        r.gross_total = dec!(1000000000000.00);
        assert!(matches!(validate(r), Err(ValidationError::Precision { .. })));

        let mut r = issuance();
        r.breakdown[0].rate = Some(dec!(1000));
        assert!(matches!(validate(r), Err(ValidationError::Precision { .. })));
    }

    // ── Consistency ───────────────────────────────────────────────────────────

    #[test]
    fn test_rejected_issuance_must_be_a_remedy() {
        let mut r = issuance();
        r.previous_rejection = true;
        assert!(matches!(validate(r.clone()), Err(ValidationError::Inconsistent { .. })));

        r.remedy = true;
        assert_eq!(validate(r), Ok(()));
    }

    #[test]
    fn test_rectifying_invoice_requires_rectification_type() {
        let mut r = issuance();
        r.invoice_type = InvoiceType::Rectifying4;
        assert!(matches!(validate(r), Err(ValidationError::Inconsistent { .. })));
    }

    #[test]
    fn test_third_party_issuer_must_be_identified() {
        let mut r = issuance();
        r.issued_by = Some(IssuedBy::ThirdParty);
        assert!(matches!(validate(r), Err(ValidationError::Inconsistent { .. })));
    }

    /// A named third party without any identifier is not identified.
    #[test]
    fn test_third_party_needs_an_identifier() {
        let mut r = issuance();
        r.issued_by = Some(IssuedBy::ThirdParty);
        r.third_party = Some(Party {
            name: "Gestoria Ejemplo S.L.".to_string(),
            nif: None,
            foreign_id: None,
        });
        assert_eq!(
            validate(r.clone()),
            Err(ValidationError::MissingField { field: "third_party.nif".to_string() })
        );

        r.third_party = Some(Party::with_nif("Gestoria Ejemplo S.L.", "B11223344"));
        assert_eq!(validate(r), Ok(()));
    }

    /// The NIF and the foreign identifier are alternatives.
    #[test]
    fn test_party_with_both_identifiers() {
        let mut r = cancellation();
        r.generator = Some(Party {
            foreign_id: Some(ForeignId {
                country_code: "FR".to_string(),
                id_type: IdType::VatId,
                id: "FR12345678901".to_string(),
            }),
            ..Party::with_nif("Empresa Ejemplo S.L.", "B12345678")
        });
        assert!(matches!(validate(r), Err(ValidationError::Inconsistent { .. })));
    }

    #[test]
    fn test_cancellation_generator_required() {
        let mut r = cancellation();
        r.generator = None;
        assert!(matches!(validate(r), Err(ValidationError::Inconsistent { .. })));
    }

    #[test]
    fn test_foreign_country_code_format() {
        let mut r = issuance();
        r.recipients = Some(vec![Party {
            name: "Client GmbH".to_string(),
            nif: None,
            foreign_id: Some(ForeignId {
                country_code: "deu".to_string(),
                id_type: IdType::VatId,
                id: "DE123456789".to_string(),
            }),
        }]);

        match validate(r) {
            Err(ValidationError::InvalidFormat { field, .. }) => {
                assert_eq!(field, "recipients[0].foreign_id.country_code");
            }
            other => panic!("expected InvalidFormat, got {:?}", other),
        }
    }

    // ── Chaining ──────────────────────────────────────────────────────────────

    #[test]
    fn test_first_with_previous_is_malformed() {
        let mut r = issuance();
        r.chaining.previous = Some(prior("FACT2024-000").link);
        assert!(matches!(validate(r), Err(ValidationError::MalformedChaining { .. })));
    }

    #[test]
    fn test_neither_first_nor_previous_is_malformed() {
        let mut r = cancellation();
        r.chaining.is_first = false;
        assert!(matches!(validate(r), Err(ValidationError::MalformedChaining { .. })));
    }

    #[test]
    fn test_previous_must_name_the_prior_record() {
        let mut r = issuance();
        r.chaining = Chaining::after(prior("FACT2024-000").link);

        let validator = RecordSchemaValidator::new();
        let record = Record::Issuance(r);

        assert_eq!(validator.validate(&record, Some(&prior("FACT2024-000"))), Ok(()));
        assert!(matches!(
            validator.validate(&record, Some(&prior("FACT2024-999"))),
            Err(ValidationError::PreviousMismatch { .. })
        ));
    }

    /// A link whose fingerprint differs from the tail is left to the chain,
    /// even when it also names another invoice.
    #[test]
    fn test_stale_fingerprint_is_not_a_validation_error() {
        let mut r = issuance();
        r.chaining = Chaining::after(RecordRef {
            invoice: invoice("FACT2024-000"),
            fingerprint: "b".repeat(64),
        });

        let validator = RecordSchemaValidator::new();
        assert_eq!(
            validator.validate(&Record::Issuance(r), Some(&prior("FACT2024-999"))),
            Ok(())
        );
    }

    #[test]
    fn test_filled_fingerprint_must_be_lowercase_hex() {
        let mut r = cancellation();
        r.fingerprint = "E3B0".repeat(16);
        assert!(matches!(validate(r.clone()), Err(ValidationError::InvalidFormat { .. })));

        r.fingerprint = "e3b0".repeat(16);
        assert_eq!(validate(r), Ok(()));
    }

    /// The first violation in field order is the one reported.
    #[test]
    fn test_first_violation_wins() {
        let mut r = issuance();
        r.issuer_name = String::new();
        r.description = String::new();
        r.chaining.is_first = false;

        assert_eq!(
            validate(r),
            Err(ValidationError::MissingField { field: "issuer_name".to_string() })
        );
    }

    /// The producer's foreign identifier follows the same format as a
    /// party's.
    #[test]
    fn test_system_other_id_format() {
        let mut r = issuance();
        r.system.other_id = Some(ForeignId {
            country_code: "P".to_string(),
            id_type: IdType::VatId,
            id: "PT123456789".to_string(),
        });
        match validate(r.clone()) {
            Err(ValidationError::InvalidFormat { field, .. }) => {
                assert_eq!(field, "system.other_id.country_code");
            }
            other => panic!("expected InvalidFormat, got {:?}", other),
        }

        if let Some(other) = r.system.other_id.as_mut() {
            other.country_code = "PT".to_string();
        }
        assert_eq!(validate(r), Ok(()));
    }

    // ── Batches ───────────────────────────────────────────────────────────────

    fn batch(records: Vec<Record>) -> SubmissionBatch {
        SubmissionBatch {
            header: SubmissionHeader::for_obligor(Taxpayer::new(
                "Empresa Ejemplo S.L.",
                "B12345678",
            )),
            records,
        }
    }

    fn validate_batch(batch: &SubmissionBatch) -> Result<(), ValidationError> {
        RecordSchemaValidator::new().validate_batch(batch)
    }

    #[test]
    fn test_valid_batch_passes() {
        let b = batch(vec![issuance().into(), cancellation().into()]);
        assert_eq!(validate_batch(&b), Ok(()));
    }

    /// A batch carries between one and a thousand records.
    #[test]
    fn test_batch_size_bounds() {
        let empty = batch(Vec::new());
        assert!(matches!(
            validate_batch(&empty),
            Err(ValidationError::Cardinality { actual: 0, .. })
        ));

        let full = batch(vec![Record::from(issuance()); 1000]);
        assert_eq!(validate_batch(&full), Ok(()));

        let over = batch(vec![Record::from(issuance()); 1001]);
        match validate_batch(&over) {
            Err(ValidationError::Cardinality { field, max, actual, .. }) => {
                assert_eq!(field, "records");
                assert_eq!(max, 1000);
                assert_eq!(actual, 1001);
            }
            other => panic!("expected Cardinality, got {:?}", other),
        }
    }

    /// Every record must be issued by the obligor named in the header.
    #[test]
    fn test_batch_records_belong_to_obligor() {
        let mut b = batch(vec![issuance().into()]);
        b.header.obligor = Taxpayer::new("Otra Empresa S.L.", "B87654321");
        assert!(matches!(validate_batch(&b), Err(ValidationError::Inconsistent { .. })));
    }

    #[test]
    fn test_representative_needs_a_nif() {
        let mut b = batch(vec![issuance().into()]);
        b.header.representative = Some(Taxpayer::new("Asesoria Ejemplo S.L.", ""));
        assert_eq!(
            validate_batch(&b),
            Err(ValidationError::MissingField { field: "header.representative.nif".to_string() })
        );
    }

    /// A batch is either voluntary or answers a requirement, never both.
    #[test]
    fn test_submission_kinds_are_alternatives() {
        let mut b = batch(vec![issuance().into()]);
        b.header.voluntary = Some(VoluntarySubmission { end_date: None, incident: true });
        b.header.requirement = Some(RequirementSubmission {
            reference: "REQ2024-0001".to_string(),
            ends_requirement: false,
        });
        assert!(matches!(validate_batch(&b), Err(ValidationError::Inconsistent { .. })));

        b.header.voluntary = None;
        assert_eq!(validate_batch(&b), Ok(()));

        if let Some(requirement) = b.header.requirement.as_mut() {
            requirement.reference = "R".repeat(19);
        }
        assert!(matches!(
            validate_batch(&b),
            Err(ValidationError::TooLong { max: 18, actual: 19, .. })
        ));
    }
}
