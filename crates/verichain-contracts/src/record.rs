//! Invoice record types: issuance ("alta") and cancellation ("anulación").
//!
//! Both variants share the chaining block, the generating-system descriptor,
//! the generation timestamp and the fingerprint fields.  `Record` is the
//! tagged union stored in the chain.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::codes::{
    ExemptionCause, GeneratedBy, HashAlgorithm, IdType, InvoiceType, IssuedBy,
    OperationQualification, RectificationType, RegimeKey, TaxType,
};
use crate::format::{self, format_date};

/// Identity triple of an invoice: issuer tax ID, series + number, issue date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvoiceId {
    pub issuer_id: String,
    pub series_number: String,
    #[serde(with = "format::date")]
    pub issue_date: NaiveDate,
}

impl InvoiceId {
    pub fn new(
        issuer_id: impl Into<String>,
        series_number: impl Into<String>,
        issue_date: NaiveDate,
    ) -> Self {
        Self {
            issuer_id: issuer_id.into(),
            series_number: series_number.into(),
            issue_date,
        }
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.issuer_id,
            self.series_number,
            format_date(self.issue_date)
        )
    }
}

/// Identity plus fingerprint of a chained record.
///
/// Used as the `previous` link of a record, as the first/last reference of an
/// export summary, and as the body of a retained anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub invoice: InvoiceId,
    pub fingerprint: String,
}

/// The chaining block carried by every record.
///
/// Exactly one of `is_first` and `previous` must be set.  The struct keeps the
/// wire shape so a malformed candidate can be represented and rejected;
/// `link()` is the checked view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chaining {
    pub is_first: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<RecordRef>,
}

/// Checked view of a [`Chaining`] block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainLink<'a> {
    First,
    After(&'a RecordRef),
}

impl Chaining {
    /// Chaining block of the first record of a chain.
    pub fn first() -> Self {
        Self { is_first: true, previous: None }
    }

    /// Chaining block linking to `previous`.
    pub fn after(previous: RecordRef) -> Self {
        Self { is_first: false, previous: Some(previous) }
    }

    /// Returns `None` when the block violates `is_first xor previous`.
    pub fn link(&self) -> Option<ChainLink<'_>> {
        match (self.is_first, &self.previous) {
            (true, None) => Some(ChainLink::First),
            (false, Some(prev)) => Some(ChainLink::After(prev)),
            _ => None,
        }
    }

    /// The declared previous fingerprint, if any.
    pub fn previous_fingerprint(&self) -> Option<&str> {
        self.previous.as_ref().map(|p| p.fingerprint.as_str())
    }
}

/// Identification issued by a foreign authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignId {
    /// ISO 3166-1 alpha-2.
    pub country_code: String,
    pub id_type: IdType,
    pub id: String,
}

/// A named party: recipient, third-party issuer or cancellation generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nif: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_id: Option<ForeignId>,
}

impl Party {
    pub fn with_nif(name: impl Into<String>, nif: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nif: Some(nif.into()),
            foreign_id: None,
        }
    }
}

/// Descriptor of the invoicing software that generated a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Name of the software producer.
    pub producer_name: String,
    pub producer_nif: String,
    /// Foreign identification of the producer, alongside its NIF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_id: Option<ForeignId>,
    pub system_name: String,
    pub system_id: String,
    pub version: String,
    pub installation_number: String,
    #[serde(default)]
    pub verifactu_only: bool,
    #[serde(default)]
    pub multi_taxpayer_capable: bool,
    #[serde(default)]
    pub multiple_taxpayers: bool,
}

impl SystemInfo {
    /// Key identifying one generating system instance.
    pub fn instance_key(&self) -> String {
        format!(
            "{}/{}/{}",
            self.producer_nif, self.system_id, self.installation_number
        )
    }
}

/// One line of the tax breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<TaxType>,
    pub regime: RegimeKey,
    pub qualification: OperationQualification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exemption: Option<ExemptionCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    pub taxable_base: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxable_base_at_cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge_amount: Option<Decimal>,
}

/// Amounts corrected by a substitution-type rectifying invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectificationAmount {
    pub base: Decimal,
    pub tax: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge: Option<Decimal>,
}

/// An invoice issuance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceRecord {
    pub version: String,
    pub invoice: InvoiceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    pub issuer_name: String,
    #[serde(default)]
    pub remedy: bool,
    #[serde(default)]
    pub previous_rejection: bool,
    pub invoice_type: InvoiceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rectification_type: Option<RectificationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rectified_invoices: Option<Vec<InvoiceId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substituted_invoices: Option<Vec<InvoiceId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rectification_amount: Option<RectificationAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "format::date::option")]
    pub operation_date: Option<NaiveDate>,
    pub description: String,
    #[serde(default)]
    pub simplified_art_7273: bool,
    #[serde(default)]
    pub no_recipient_art_61d: bool,
    #[serde(default)]
    pub macrodata: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<IssuedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party: Option<Party>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<Party>>,
    #[serde(default)]
    pub coupon: bool,
    pub breakdown: Vec<TaxLine>,
    pub tax_total: Decimal,
    pub gross_total: Decimal,
    pub chaining: Chaining,
    pub system: SystemInfo,
    pub generated_at: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_registration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_agreement_id: Option<String>,
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    /// Empty on a candidate; filled in by the chain on append.
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// An invoice cancellation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub version: String,
    /// The invoice being cancelled.
    pub invoice: InvoiceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(default)]
    pub no_prior_record: bool,
    #[serde(default)]
    pub previous_rejection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<GeneratedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<Party>,
    pub chaining: Chaining,
    pub system: SystemInfo,
    pub generated_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Discriminant of a [`Record`], used in counts and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Issuance,
    Cancellation,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Issuance => f.write_str("issuance"),
            RecordKind::Cancellation => f.write_str("cancellation"),
        }
    }
}

/// A record in the invoice chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Issuance(IssuanceRecord),
    Cancellation(CancellationRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Issuance(_) => RecordKind::Issuance,
            Record::Cancellation(_) => RecordKind::Cancellation,
        }
    }

    pub fn invoice(&self) -> &InvoiceId {
        match self {
            Record::Issuance(r) => &r.invoice,
            Record::Cancellation(r) => &r.invoice,
        }
    }

    pub fn chaining(&self) -> &Chaining {
        match self {
            Record::Issuance(r) => &r.chaining,
            Record::Cancellation(r) => &r.chaining,
        }
    }

    pub fn set_chaining(&mut self, chaining: Chaining) {
        match self {
            Record::Issuance(r) => r.chaining = chaining,
            Record::Cancellation(r) => r.chaining = chaining,
        }
    }

    pub fn system(&self) -> &SystemInfo {
        match self {
            Record::Issuance(r) => &r.system,
            Record::Cancellation(r) => &r.system,
        }
    }

    pub fn generated_at(&self) -> &DateTime<FixedOffset> {
        match self {
            Record::Issuance(r) => &r.generated_at,
            Record::Cancellation(r) => &r.generated_at,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Record::Issuance(r) => r.algorithm,
            Record::Cancellation(r) => r.algorithm,
        }
    }

    pub fn fingerprint(&self) -> &str {
        match self {
            Record::Issuance(r) => &r.fingerprint,
            Record::Cancellation(r) => &r.fingerprint,
        }
    }

    pub fn set_fingerprint(&mut self, fingerprint: String) {
        match self {
            Record::Issuance(r) => r.fingerprint = fingerprint,
            Record::Cancellation(r) => r.fingerprint = fingerprint,
        }
    }

    pub fn signature(&self) -> Option<&str> {
        match self {
            Record::Issuance(r) => r.signature.as_deref(),
            Record::Cancellation(r) => r.signature.as_deref(),
        }
    }

    pub fn set_signature(&mut self, signature: Option<String>) {
        match self {
            Record::Issuance(r) => r.signature = signature,
            Record::Cancellation(r) => r.signature = signature,
        }
    }

    /// Identity plus stored fingerprint of this record.
    pub fn to_ref(&self) -> RecordRef {
        RecordRef {
            invoice: self.invoice().clone(),
            fingerprint: self.fingerprint().to_string(),
        }
    }
}

impl From<IssuanceRecord> for Record {
    fn from(r: IssuanceRecord) -> Self {
        Record::Issuance(r)
    }
}

impl From<CancellationRecord> for Record {
    fn from(r: CancellationRecord) -> Self {
        Record::Cancellation(r)
    }
}
