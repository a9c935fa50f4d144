//! Per-field ceilings and cardinality bounds of the record model.

/// `version`.
pub const VERSION_MAX: usize = 3;
/// Tax identification numbers (NIF).
pub const NIF_MAX: usize = 9;
pub const SERIES_NUMBER_MAX: usize = 60;
pub const EXTERNAL_REF_MAX: usize = 60;
/// Names of parties, issuers and software producers.
pub const NAME_MAX: usize = 120;
pub const DESCRIPTION_MAX: usize = 500;
pub const COUNTRY_CODE_LEN: usize = 2;
pub const FOREIGN_ID_MAX: usize = 20;
pub const SYSTEM_NAME_MAX: usize = 30;
pub const SYSTEM_ID_MAX: usize = 2;
pub const SYSTEM_VERSION_MAX: usize = 50;
pub const INSTALLATION_NUMBER_MAX: usize = 100;
pub const AGREEMENT_REGISTRATION_MAX: usize = 15;
pub const SYSTEM_AGREEMENT_ID_MAX: usize = 16;
pub const FINGERPRINT_MAX: usize = 64;
/// Reference of a tax administration requirement.
pub const REQUIREMENT_REF_MAX: usize = 18;

/// Tax breakdown lines per issuance.
pub const BREAKDOWN_MIN: usize = 1;
pub const BREAKDOWN_MAX: usize = 12;

/// Records per submission batch.
pub const BATCH_MIN: usize = 1;
pub const BATCH_MAX: usize = 1000;

/// Rectified, substituted and recipient lists.
pub const INVOICE_LIST_MIN: usize = 1;
pub const INVOICE_LIST_MAX: usize = 1000;

/// Currency amounts: Decimal(12, 2).
pub const AMOUNT_INTEGER_DIGITS: u32 = 12;
/// Percentages: Decimal(3, 2).
pub const RATE_INTEGER_DIGITS: u32 = 3;
pub const FRACTION_DIGITS: u32 = 2;
