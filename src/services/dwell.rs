//! Dwell indicator - funnel stage 3
//!
//! Per-member dwell is `last - first` sighting at a terminal, after the entry
//! RSSI and window filters. The simple variant counts members at or above each
//! configured threshold; the advanced variant reports the median dwell and
//! cannot feed `rate()`.

use crate::domain::table::{dwell_count_column, MetricValue, ResultTable, DWELL_MEDIAN};
use crate::domain::types::{Stage, TimeWindow};
use crate::error::FunnelResult;
use crate::infra::lookup::{DwellThresholdSet, ThresholdRegime};
use crate::services::aggregate::{filter_sightings, median, member_spans, tabulate};
use crate::services::context::FunnelContext;
use crate::services::indicator::{Algorithm, FunnelIndicator, RateIndicator};
use crate::services::rates;
use std::sync::Arc;
use tracing::info;

pub struct DwellIndicator {
    ctx: Arc<FunnelContext>,
    thresholds: DwellThresholdSet,
    last: Option<ResultTable>,
}

impl DwellIndicator {
    pub fn new(ctx: Arc<FunnelContext>, thresholds: DwellThresholdSet) -> Self {
        Self { ctx, thresholds, last: None }
    }

    pub fn thresholds(&self) -> &DwellThresholdSet {
        &self.thresholds
    }

    fn count_simple(&self, window: Option<&TimeWindow>) -> ResultTable {
        let rssi = self.ctx.thresholds();
        let columns: Vec<(u64, String)> =
            self.thresholds.iter().map(|t| (t, dwell_count_column(t))).collect();

        tabulate(self.ctx.proximity(), self.ctx.tenants(), |terminal_id, events, row| {
            let threshold = rssi.threshold(terminal_id, ThresholdRegime::Entry);
            let kept = filter_sightings(terminal_id, events, threshold, window);
            let durations: Vec<f64> =
                member_spans(&kept).values().map(|span| span.duration_secs()).collect();

            for (secs, column) in &columns {
                let limit = *secs as f64;
                let members = durations.iter().filter(|d| **d >= limit).count();
                row.set(column, MetricValue::Count(members as u64));
            }
        })
    }

    /// Median per-member dwell over every dated sighting
    fn count_advanced(&self) -> ResultTable {
        tabulate(self.ctx.proximity(), self.ctx.tenants(), |terminal_id, events, row| {
            let all = filter_sightings(terminal_id, events, None, None);
            let mut durations: Vec<f64> =
                member_spans(&all).values().map(|span| span.duration_secs()).collect();
            row.set(DWELL_MEDIAN, MetricValue::Real(median(&mut durations)));
        })
    }
}

impl FunnelIndicator for DwellIndicator {
    fn name(&self) -> &'static str {
        "DwellIndicator"
    }

    fn stage(&self) -> Stage {
        Stage::Dwell
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
            thresholds = ?self.thresholds.as_slice(),
            terminals = %table.len(),
            "dwell_counted"
        );

        self.last = Some(table.clone());
        Ok(table)
    }

    fn last_count(&self) -> Option<&ResultTable> {
        self.last.as_ref()
    }
}

impl RateIndicator for DwellIndicator {
    /// Visit count table
    type Upstream<'a> = &'a ResultTable;

    fn rate(&self, visit: Self::Upstream<'_>) -> FunnelResult<ResultTable> {
        rates::dwell_rate(self.counted()?, visit, &self.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::{IndicatorResultRow, VISIT_COUNT};
    use crate::domain::types::{MemberId, ProximityEvent, TerminalId, TransactionEvent};
    use crate::error::FunnelError;
    use crate::infra::lookup::{RssiThresholds, TenantMapping, ThresholdConfig};
    use crate::services::store::TerminalEventStore;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 1).unwrap().and_hms_opt(11, 0, 0).unwrap()
    }

    fn stay(member: &str, secs: i64, rssi: f64) -> Vec<ProximityEvent> {
        [0, secs]
            .into_iter()
            .map(|offset| ProximityEvent {
                terminal_id: TerminalId::from("T1"),
                member_id: MemberId::from(member),
                event_time: Some(base() + Duration::seconds(offset)),
                rssi,
            })
            .collect()
    }

    fn context(events: Vec<ProximityEvent>) -> Arc<FunnelContext> {
        let tenants: TenantMapping =
            [(TerminalId::from("T1"), "Cafe".to_string())].into_iter().collect();
        let thresholds: ThresholdConfig =
            [(TerminalId::from("T1"), RssiThresholds { pass_by: None, entry: Some(-40.0) })]
                .into_iter()
                .collect();
        Arc::new(FunnelContext::new(
            TerminalEventStore::from_events(events),
            TerminalEventStore::<TransactionEvent>::new(),
            tenants,
            thresholds,
        ))
    }

    fn indicator(events: Vec<ProximityEvent>, thresholds: &[u64]) -> DwellIndicator {
        DwellIndicator::new(context(events), DwellThresholdSet::new(thresholds))
    }

    fn four_members() -> Vec<ProximityEvent> {
        [("a", 30), ("b", 70), ("c", 200), ("d", 500)]
            .into_iter()
            .flat_map(|(m, secs)| stay(m, secs, -30.0))
            .collect()
    }

    #[test]
    fn test_threshold_counts() {
        let mut ind = indicator(four_members(), &[60, 180]);
        let table = ind.count(Algorithm::Simple, None).unwrap();
        let row = &table.rows()[0];
        assert_eq!(row.get("dwellCount_60"), Some(MetricValue::Count(3)));
        assert_eq!(row.get("dwellCount_180"), Some(MetricValue::Count(2)));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut ind = indicator(stay("a", 60, -30.0), &[60]);
        let table = ind.count(Algorithm::Simple, None).unwrap();
        assert_eq!(table.rows()[0].get("dwellCount_60"), Some(MetricValue::Count(1)));
    }

    #[test]
    fn test_entry_threshold_applies() {
        let mut events = four_members();
        events.extend(stay("weak", 1000, -60.0));
        let mut ind = indicator(events, &[300]);
        let table = ind.count(Algorithm::Simple, None).unwrap();
        assert_eq!(table.rows()[0].get("dwellCount_300"), Some(MetricValue::Count(1)));
    }

    #[test]
    fn test_advanced_reports_median() {
        let mut ind = DwellIndicator::new(context(four_members()), DwellThresholdSet::default());
        let table = ind.count(Algorithm::Advanced, None).unwrap();
        assert_eq!(table.rows()[0].get(DWELL_MEDIAN), Some(MetricValue::Real(135.0)));
        assert!(table.rows()[0].get("dwellCount_60").is_none());
    }

    #[test]
    fn test_rate_over_visits() {
        let mut ind = indicator(four_members(), &[60, 180]);
        ind.count(Algorithm::Simple, None).unwrap();

        let visit_row = IndicatorResultRow::new("Cafe", TerminalId::from("T1"))
            .with_metric(VISIT_COUNT, MetricValue::Count(4));
        let visit = ResultTable::from_rows(vec![visit_row]);
        let rates = ind.rate(&visit).unwrap();
        assert_eq!(rates.rows()[0].get("dwellRate_60"), Some(MetricValue::Real(0.75)));
        assert_eq!(rates.rows()[0].get("dwellRate_180"), Some(MetricValue::Real(0.5)));
    }

    #[test]
    fn test_rate_on_advanced_output_is_schema_error() {
        let mut ind = indicator(four_members(), &[60]);
        ind.count(Algorithm::Advanced, None).unwrap();
        let err = ind.rate(&ResultTable::new()).unwrap_err();
        assert!(matches!(err, FunnelError::Schema { .. }));
    }
}
