//! Ledger wiring for the ERP reference runtime.

use tracing::debug;

use verichain_chain::{events::Clock, InMemoryEventLog, InMemoryRecordChain};
use verichain_contracts::error::LedgerResult;
use verichain_core::{Ledger, LedgerConfig};
use verichain_detect::ChainAnomalyScanner;
use verichain_validate::RecordSchemaValidator;

use crate::fixtures;

/// Embedded ledger configuration of the reference runtime.
const ERP_CONFIG: &str = include_str!("../config/erp.toml");

pub fn erp_config() -> LedgerResult<LedgerConfig> {
    LedgerConfig::from_toml_str(ERP_CONFIG)
}

/// Wire the reference components from `config`, with events stamped by the
/// system clock.
pub fn build_ledger(config: &LedgerConfig) -> Ledger {
    let events = InMemoryEventLog::new(config.event_producer());
    assemble(config, events)
}

/// Like `build_ledger`, with events stamped by `clock`.
pub fn build_ledger_with_clock(config: &LedgerConfig, clock: Clock) -> Ledger {
    let events = InMemoryEventLog::with_clock(config.event_producer(), clock);
    assemble(config, events)
}

fn assemble(config: &LedgerConfig, events: InMemoryEventLog) -> Ledger {
    let keys = fixtures::key_store();
    debug!(
        scope = %config.chain.scope,
        system_id = %config.producer.system_id,
        signers = keys.len(),
        "wiring ERP ledger"
    );
    let scanner = ChainAnomalyScanner::new(config.detector).with_verifier(Box::new(keys));

    Ledger::new(
        Box::new(RecordSchemaValidator::new()),
        Box::new(InMemoryRecordChain::new(config.chain.scope)),
        Box::new(events),
        Box::new(scanner),
    )
}
