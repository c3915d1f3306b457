//! Shared, immutable inputs for one report-generation pass
//!
//! A `FunnelContext` bundles both event stores with the tenant mapping and
//! RSSI thresholds. Indicators hold it behind an `Arc` and only read it.

use crate::domain::types::{ProximityEvent, TransactionEvent};
use crate::error::FunnelResult;
use crate::infra::lookup::{TenantMapping, ThresholdConfig};
use crate::io::ingest::{proximity_events, transaction_events};
use crate::io::raw_table::RawTable;
use crate::services::store::TerminalEventStore;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct FunnelContext {
    proximity: TerminalEventStore<ProximityEvent>,
    transactions: TerminalEventStore<TransactionEvent>,
    tenants: TenantMapping,
    thresholds: ThresholdConfig,
}

impl FunnelContext {
    pub fn new(
        proximity: TerminalEventStore<ProximityEvent>,
        transactions: TerminalEventStore<TransactionEvent>,
        tenants: TenantMapping,
        thresholds: ThresholdConfig,
    ) -> Self {
        info!(
            proximity_terminals = %proximity.terminal_count(),
            proximity_events = %proximity.event_count(),
            transaction_terminals = %transactions.terminal_count(),
            transaction_events = %transactions.event_count(),
            mapped_terminals = %tenants.len(),
            threshold_terminals = %thresholds.len(),
            "funnel_context_ready"
        );
        Self { proximity, transactions, tenants, thresholds }
    }

    /// Build from the cleaning layer's raw proximity and transaction tables
    pub fn from_tables(
        proximity: &RawTable,
        transactions: &RawTable,
        tenants: TenantMapping,
        thresholds: ThresholdConfig,
    ) -> FunnelResult<Self> {
        let proximity = TerminalEventStore::from_events(proximity_events(proximity)?);
        let transactions = TerminalEventStore::from_events(transaction_events(transactions)?);
        Ok(Self::new(proximity, transactions, tenants, thresholds))
    }

    pub fn proximity(&self) -> &TerminalEventStore<ProximityEvent> {
        &self.proximity
    }

    pub fn transactions(&self) -> &TerminalEventStore<TransactionEvent> {
        &self.transactions
    }

    pub fn tenants(&self) -> &TenantMapping {
        &self.tenants
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// Pretty JSON profile of both stores, keyed by store then terminal
    pub fn profile_json(&self) -> String {
        let mut doc = BTreeMap::new();
        doc.insert("proximity", self.proximity.profile(&self.tenants));
        doc.insert("transactions", self.transactions.profile(&self.tenants));
        serde_json::to_string_pretty(&doc).unwrap_or_else(|_| "{}".to_string())
    }
}
