//! Pass-by indicator - funnel stage 1
//!
//! Distinct members sighted at each terminal under the coarse pass-by RSSI
//! threshold. This is the funnel's first denominator and has no rate.

use crate::domain::table::{MetricValue, ResultTable, PASS_BY_COUNT};
use crate::domain::types::{Stage, TimeWindow};
use crate::error::FunnelResult;
use crate::infra::lookup::ThresholdRegime;
use crate::services::aggregate::{distinct_members, filter_sightings, tabulate};
use crate::services::context::FunnelContext;
use crate::services::indicator::{Algorithm, FunnelIndicator};
use std::sync::Arc;
use tracing::info;

/// Fixed RSSI cut used by the advanced variant (dBm, strictly greater than)
const ADVANCED_RSSI_FLOOR: f64 = -75.0;

pub struct PassByIndicator {
    ctx: Arc<FunnelContext>,
    last: Option<ResultTable>,
}

impl PassByIndicator {
    pub fn new(ctx: Arc<FunnelContext>) -> Self {
        Self { ctx, last: None }
    }

    fn count_simple(&self, window: Option<&TimeWindow>) -> ResultTable {
        let thresholds = self.ctx.thresholds();
        tabulate(self.ctx.proximity(), self.ctx.tenants(), |terminal_id, events, row| {
            let threshold = thresholds.threshold(terminal_id, ThresholdRegime::PassBy);
            let kept = filter_sightings(terminal_id, events, threshold, window);
            row.set(PASS_BY_COUNT, MetricValue::Count(distinct_members(&kept)));
        })
    }

    /// Sightings (not members) above a fixed floor, whole batch
    fn count_advanced(&self) -> ResultTable {
        tabulate(self.ctx.proximity(), self.ctx.tenants(), |_, events, row| {
            let sightings = events.iter().filter(|e| e.rssi > ADVANCED_RSSI_FLOOR).count();
            row.set(PASS_BY_COUNT, MetricValue::Count(sightings as u64));
        })
    }
}

impl FunnelIndicator for PassByIndicator {
    fn name(&self) -> &'static str {
        "PassByIndicator"
    }

    fn stage(&self) -> Stage {
        Stage::PassBy
    }

    fn count(
        &mut self,
        algorithm: Algorithm,
        window: Option<TimeWindow>,
    ) -> FunnelResult<ResultTable> {
        let table = match algorithm {
            Algorithm::Simple => self.count_simple(window.as_ref()),
            Algorithm::Advanced => self.count_advanced(),
        };

        info!(
            stage = %self.stage(),
            algorithm = %algorithm,
            window = ?window.map(|w| w.to_string()),
            terminals = %table.len(),
            "pass_by_counted"
        );

        self.last = Some(table.clone());
        Ok(table)
    }

    fn last_count(&self) -> Option<&ResultTable> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{MemberId, ProximityEvent, TerminalId, TransactionEvent};
    use crate::infra::lookup::{RssiThresholds, TenantMapping, ThresholdConfig};
    use crate::services::store::TerminalEventStore;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn sighting(terminal: &str, member: &str, h: u32, m: u32, rssi: f64) -> ProximityEvent {
        ProximityEvent {
            terminal_id: TerminalId::from(terminal),
            member_id: MemberId::from(member),
            event_time: Some(at(h, m)),
            rssi,
        }
    }

    fn indicator(events: Vec<ProximityEvent>, pass_by: Option<f64>) -> PassByIndicator {
        let tenants: TenantMapping =
            [(TerminalId::from("T1"), "Cafe".to_string())].into_iter().collect();
        let thresholds: ThresholdConfig =
            [(TerminalId::from("T1"), RssiThresholds { pass_by, entry: None })]
                .into_iter()
                .collect();
        let ctx = FunnelContext::new(
            TerminalEventStore::from_events(events),
            TerminalEventStore::<TransactionEvent>::new(),
            tenants,
            thresholds,
        );
        PassByIndicator::new(Arc::new(ctx))
    }

    fn count_of(table: &ResultTable, terminal: &str) -> u64 {
        let row = table.rows().iter().find(|r| r.terminal_id.0 == terminal).unwrap();
        row.get(PASS_BY_COUNT).and_then(|v| v.as_count()).unwrap()
    }

    #[test]
    fn test_simple_counts_distinct_members_above_threshold() {
        let mut ind = indicator(
            vec![
                sighting("T1", "a", 11, 0, -50.0),
                sighting("T1", "a", 11, 5, -50.0),
                sighting("T1", "b", 11, 10, -70.0),
                sighting("T1", "c", 11, 10, -55.0),
            ],
            Some(-60.0),
        );
        let table = ind.count(Algorithm::Simple, None).unwrap();
        assert_eq!(count_of(&table, "T1"), 2);
        assert_eq!(table.rows()[0].tenant_name, "Cafe");
    }

    #[test]
    fn test_simple_without_threshold_keeps_all() {
        let mut ind = indicator(
            vec![sighting("T1", "a", 11, 0, -95.0), sighting("T1", "b", 11, 0, -20.0)],
            None,
        );
        let table = ind.count(Algorithm::Simple, None).unwrap();
        assert_eq!(count_of(&table, "T1"), 2);
    }

    #[test]
    fn test_simple_respects_window_and_unknown_tenant() {
        let mut ind = indicator(
            vec![
                sighting("T1", "a", 11, 0, -50.0),
                sighting("T1", "b", 13, 0, -50.0),
                sighting("T2", "c", 11, 30, -50.0),
            ],
            None,
        );
        let window = TimeWindow::new(at(11, 0), at(12, 0));
        let table = ind.count(Algorithm::Simple, Some(window)).unwrap();
        assert_eq!(count_of(&table, "T1"), 1);
        assert_eq!(count_of(&table, "T2"), 1);
        assert_eq!(table.rows()[1].tenant_name, "Unknown");
    }

    #[test]
    fn test_terminal_with_no_window_events_reports_zero() {
        let mut ind = indicator(vec![sighting("T1", "a", 9, 0, -50.0)], None);
        let window = TimeWindow::new(at(11, 0), at(12, 0));
        let table = ind.count(Algorithm::Simple, Some(window)).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(count_of(&table, "T1"), 0);
    }

    #[test]
    fn test_advanced_counts_sightings_above_floor() {
        let mut ind = indicator(
            vec![
                sighting("T1", "a", 11, 0, -50.0),
                sighting("T1", "a", 23, 0, -60.0),
                sighting("T1", "b", 11, 0, -75.0),
            ],
            Some(-40.0),
        );
        let window = TimeWindow::new(at(11, 0), at(12, 0));
        let table = ind.count(Algorithm::Advanced, Some(window)).unwrap();
        assert_eq!(count_of(&table, "T1"), 2);
    }

    #[test]
    fn test_count_caches_result() {
        let mut ind = indicator(vec![sighting("T1", "a", 11, 0, -50.0)], None);
        assert!(ind.last_count().is_none());
        let table = ind.count(Algorithm::Simple, None).unwrap();
        assert_eq!(ind.counted().unwrap(), &table);
    }

    #[test]
    fn test_count_by_name_rejects_unknown_method() {
        let mut ind = indicator(vec![], None);
        assert!(ind.count_by_name("simple", None).is_ok());
        assert!(ind.count_by_name("median", None).is_err());
    }
}
