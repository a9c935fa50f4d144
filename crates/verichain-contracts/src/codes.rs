//! Closed code lists used by records and events.
//!
//! Every enum here serializes as its short code (`"F1"`, `"01"`, `"S"`, …)
//! so the persisted layout and the canonical fingerprint input carry the same
//! value the tax authority lists define.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declares a closed code list: serde uses the code as the wire value and the
/// enum gains `code()`, `from_code()` and a `Display` that prints the code.
macro_rules! closed_codes {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $code)] $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The closed code for this value.
            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Look up a value by its code.
            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

closed_codes! {
    /// Tax the breakdown line is levied under (L1).
    pub enum TaxType {
        /// Impuesto sobre el Valor Añadido.
        Iva = "01",
        /// Impuesto sobre la Producción, los Servicios y la Importación.
        Ipsi = "02",
        /// Impuesto General Indirecto Canario.
        Igic = "03",
        Other = "05",
    }
}

closed_codes! {
    /// Invoice type (L2).
    pub enum InvoiceType {
        /// Full invoice.
        Invoice = "F1",
        /// Simplified invoice.
        Simplified = "F2",
        /// Invoice issued in substitution of simplified invoices.
        Substitution = "F3",
        Rectifying1 = "R1",
        Rectifying2 = "R2",
        Rectifying3 = "R3",
        Rectifying4 = "R4",
        /// Rectification of a simplified invoice.
        Rectifying5 = "R5",
    }
}

impl InvoiceType {
    /// True for the R1–R5 rectifying types.
    pub fn is_rectifying(self) -> bool {
        matches!(
            self,
            InvoiceType::Rectifying1
                | InvoiceType::Rectifying2
                | InvoiceType::Rectifying3
                | InvoiceType::Rectifying4
                | InvoiceType::Rectifying5
        )
    }
}

closed_codes! {
    /// How a rectifying invoice corrects the original (L3).
    pub enum RectificationType {
        Substitution = "S",
        Differences = "I",
    }
}

closed_codes! {
    /// Who issued the invoice on behalf of the obligor (L6).
    pub enum IssuedBy {
        Recipient = "D",
        ThirdParty = "T",
    }
}

closed_codes! {
    /// Type of a non-Spanish identification document (L7).
    pub enum IdType {
        VatId = "02",
        Passport = "03",
        OfficialDocument = "04",
        ResidenceCertificate = "05",
        OtherDocument = "06",
        NotRegistered = "07",
    }
}

closed_codes! {
    /// VAT regime key of a breakdown line (L8A).
    pub enum RegimeKey {
        General = "01",
        Export = "02",
        UsedGoods = "03",
        InvestmentGold = "04",
        TravelAgencies = "05",
        EntityGroup = "06",
        CashBasis = "07",
        IpsiIgic = "08",
    }
}

closed_codes! {
    /// Operation qualification of a breakdown line (L9).
    pub enum OperationQualification {
        SubjectNotExempt = "S1",
        SubjectNotExemptReverseCharge = "S2",
        NotSubjectArticle = "N1",
        NotSubjectLocation = "N2",
    }
}

closed_codes! {
    /// Exemption cause of a breakdown line (L10).
    pub enum ExemptionCause {
        Article20 = "E1",
        Article21 = "E2",
        Article22 = "E3",
        Articles23And24 = "E4",
        Article25 = "E5",
        Other = "E6",
    }
}

closed_codes! {
    /// Digest algorithm used for fingerprints (L12).
    pub enum HashAlgorithm {
        Sha256 = "01",
    }
}

impl HashAlgorithm {
    /// Length, in hex characters, of a fingerprint produced by this algorithm.
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
        }
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

closed_codes! {
    /// Who generated a cancellation record (L16).
    pub enum GeneratedBy {
        Issuer = "E",
        Recipient = "D",
        ThirdParty = "T",
    }
}

closed_codes! {
    /// Anomaly classification used by detector findings (L1E).
    pub enum AnomalyType {
        FingerprintIntegrity = "01",
        SignatureIntegrity = "02",
        IntegrityOther = "03",
        ChainNotFirst = "04",
        ChainNotLast = "05",
        ChainOther = "06",
        Other = "90",
    }
}

closed_codes! {
    /// Event log entry type (L2E).
    pub enum EventType {
        LifecycleStart = "01",
        LifecycleStop = "02",
        RecordScanLaunched = "03",
        RecordAnomalyDetected = "04",
        EventScanLaunched = "05",
        EventAnomalyDetected = "06",
        BackupRestored = "07",
        RecordsExported = "08",
        EventsExported = "09",
        PeriodSummary = "10",
        Other = "90",
    }
}
