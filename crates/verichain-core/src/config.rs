//! TOML-driven ledger configuration.
//!
//! Example:
//! ```toml
//! [chain]
//! scope = "per-system"
//!
//! [producer]
//! obligor_name = "Empresa Ejemplo S.L."
//! obligor_nif = "B12345678"
//! system_id = "SI001"
//!
//! # Only when a third party keeps the log for the obligor:
//! # kept_by = "T"
//! # keeper = { name = "Gestoria Ejemplo S.L.", nif = "B11223344" }
//!
//! [detector]
//! signatures = false
//! ```
//!
//! Every section is optional and falls back to its defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use verichain_contracts::{
    anomaly::DetectorConfig,
    chain::ChainScope,
    error::{LedgerError, LedgerResult},
    codes::IssuedBy,
    event::EventProducer,
    record::Party,
};

/// Settings of the record chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSection {
    pub scope: ChainScope,
}

/// Identity written into every event log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerSection {
    pub obligor_name: String,
    pub obligor_nif: String,
    pub system_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kept_by: Option<IssuedBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keeper: Option<Party>,
}

impl Default for ProducerSection {
    fn default() -> Self {
        Self {
            obligor_name: "unnamed obligor".to_string(),
            obligor_nif: "000000000".to_string(),
            system_id: "00".to_string(),
            kept_by: None,
            keeper: None,
        }
    }
}

impl ProducerSection {
    /// A log kept on the obligor's behalf must name an identified keeper.
    fn check(&self) -> LedgerResult<()> {
        match (&self.kept_by, &self.keeper) {
            (Some(_), None) => Err(LedgerError::Config {
                reason: "producer.kept_by is set but producer.keeper is missing".to_string(),
            }),
            (None, Some(_)) => Err(LedgerError::Config {
                reason: "producer.keeper is set but producer.kept_by is missing".to_string(),
            }),
            (Some(_), Some(keeper)) if keeper.nif.is_none() == keeper.foreign_id.is_none() => {
                Err(LedgerError::Config {
                    reason: "producer.keeper needs exactly one of nif or foreign_id".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl From<ProducerSection> for EventProducer {
    fn from(p: ProducerSection) -> Self {
        EventProducer {
            obligor_name: p.obligor_name,
            obligor_nif: p.obligor_nif,
            system_id: p.system_id,
            kept_by: p.kept_by,
            keeper: p.keeper,
        }
    }
}

/// The top-level structure deserialized from a TOML ledger file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub chain: ChainSection,
    pub producer: ProducerSection,
    pub detector: DetectorConfig,
}

impl LedgerConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `LedgerError::Config` if the TOML is malformed or does not
    /// match the expected schema.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = toml::from_str(s).map_err(|e| LedgerError::Config {
            reason: format!("failed to parse ledger TOML: {}", e),
        })?;
        config.producer.check()?;
        debug!(
            scope = %config.chain.scope,
            system_id = %config.producer.system_id,
            "ledger configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML ledger configuration.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::Config {
            reason: format!("failed to read ledger config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn event_producer(&self) -> EventProducer {
        self.producer.clone().into()
    }
}
