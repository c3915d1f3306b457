//! Per-terminal event storage
//!
//! Events are grouped by terminal in an ordered map so every indicator walks
//! terminals in the same order and produces identically ordered rows.

use crate::domain::types::{MemberId, TerminalEvent, TerminalId};
use crate::infra::lookup::TenantMapping;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Cleaned events of one kind, partitioned by terminal
#[derive(Debug, Clone)]
pub struct TerminalEventStore<E> {
    terminals: BTreeMap<TerminalId, Vec<E>>,
}

impl<E> Default for TerminalEventStore<E> {
    fn default() -> Self {
        Self { terminals: BTreeMap::new() }
    }
}

/// Row-count summary for one terminal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalProfile {
    pub tenant_name: Option<String>,
    pub row_count: usize,
    pub unique_members: Option<usize>,
}

impl<E: TerminalEvent> TerminalEventStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a flat event list by terminal, preserving per-terminal order
    pub fn from_events<I: IntoIterator<Item = E>>(events: I) -> Self {
        let mut store = Self::new();
        for event in events {
            store.insert(event);
        }
        store
    }

    pub fn insert(&mut self, event: E) {
        self.terminals.entry(event.terminal_id().clone()).or_default().push(event);
    }

    /// Terminals in ascending id order with their events
    pub fn iter(&self) -> impl Iterator<Item = (&TerminalId, &[E])> {
        self.terminals.iter().map(|(id, events)| (id, events.as_slice()))
    }

    pub fn get(&self, terminal_id: &TerminalId) -> Option<&[E]> {
        self.terminals.get(terminal_id).map(Vec::as_slice)
    }

    pub fn terminal_ids(&self) -> impl Iterator<Item = &TerminalId> {
        self.terminals.keys()
    }

    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    pub fn event_count(&self) -> usize {
        self.terminals.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    /// Per-terminal row counts, with distinct members for member-bearing events
    pub fn profile(&self, tenants: &TenantMapping) -> BTreeMap<TerminalId, TerminalProfile> {
        self.terminals
            .iter()
            .map(|(id, events)| {
                let members: FxHashSet<&MemberId> =
                    events.iter().filter_map(|e| e.member_id()).collect();
                let has_members = events.iter().any(|e| e.member_id().is_some());
                let tenant_name = tenants.contains(id).then(|| tenants.tenant_for(id).to_string());
                let profile = TerminalProfile {
                    tenant_name,
                    row_count: events.len(),
                    unique_members: has_members.then_some(members.len()),
                };
                (id.clone(), profile)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ProximityEvent, TransactionEvent};

    fn sighting(terminal: &str, member: &str) -> ProximityEvent {
        ProximityEvent {
            terminal_id: TerminalId::from(terminal),
            member_id: MemberId::from(member),
            event_time: None,
            rssi: -50.0,
        }
    }

    #[test]
    fn test_groups_by_terminal_in_order() {
        let store = TerminalEventStore::from_events(vec![
            sighting("T2", "a"),
            sighting("T1", "b"),
            sighting("T2", "c"),
        ]);

        let ids: Vec<&str> = store.terminal_ids().map(|t| t.0.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2"]);
        assert_eq!(store.get(&TerminalId::from("T2")).unwrap().len(), 2);
        assert_eq!(store.event_count(), 3);
        assert_eq!(store.terminal_count(), 2);
    }

    #[test]
    fn test_profile_counts_members() {
        let store = TerminalEventStore::from_events(vec![
            sighting("T1", "a"),
            sighting("T1", "a"),
            sighting("T1", "b"),
            sighting("T9", "c"),
        ]);
        let tenants: TenantMapping =
            [(TerminalId::from("T1"), "Cafe".to_string())].into_iter().collect();

        let profile = store.profile(&tenants);
        let t1 = &profile[&TerminalId::from("T1")];
        assert_eq!(t1.tenant_name.as_deref(), Some("Cafe"));
        assert_eq!(t1.row_count, 3);
        assert_eq!(t1.unique_members, Some(2));
        assert_eq!(profile[&TerminalId::from("T9")].tenant_name, None);
    }

    #[test]
    fn test_profile_transactions_have_no_members() {
        let store = TerminalEventStore::from_events(vec![TransactionEvent {
            terminal_id: TerminalId::from("T1"),
            tenant_name: "Cafe".to_string(),
            event_time: None,
        }]);
        let profile = store.profile(&TenantMapping::default());
        assert_eq!(profile[&TerminalId::from("T1")].unique_members, None);
    }
}
