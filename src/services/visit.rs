//! Visit indicator - funnel stage 2
//!
//! Same mechanics as pass-by, but under the tighter entry RSSI threshold.
//! Also reports the mean per-member dwell time under the same filters.

use crate::domain::table::{
    MetricValue, ResultTable, AVERAGE_DWELL_TIME, VISIT_COUNT,
};
use crate::domain::types::{Stage, TimeWindow};
use crate::error::FunnelResult;
use crate::infra::lookup::ThresholdRegime;
use crate::services::aggregate::{distinct_members, filter_sightings, mean, member_spans, tabulate};
use crate::services::context::FunnelContext;
use crate::services::indicator::{Algorithm, FunnelIndicator, RateIndicator};
use crate::services::rates;
use std::sync::Arc;
use tracing::info;

pub struct VisitIndicator {
    ctx: Arc<FunnelContext>,
    last: Option<ResultTable>,
}

impl VisitIndicator {
    pub fn new(ctx: Arc<FunnelContext>) -> Self {
        Self { ctx, last: None }
    }

    fn count_simple(&self, window: Option<&TimeWindow>) -> ResultTable {
        let thresholds = self.ctx.thresholds();
        tabulate(self.ctx.proximity(), self.ctx.tenants(), |terminal_id, events, row| {
            let threshold = thresholds.threshold(terminal_id, ThresholdRegime::Entry);
            let kept = filter_sightings(terminal_id, events, threshold, window);
            row.set(VISIT_COUNT, MetricValue::Count(distinct_members(&kept)));
        })
    }

    /// Distinct members over every sighting, no filtering
    fn count_advanced(&self) -> ResultTable {
        tabulate(self.ctx.proximity(), self.ctx.tenants(), |_, events, row| {
            let all: Vec<_> = events.iter().collect();
            row.set(VISIT_COUNT, MetricValue::Count(distinct_members(&all)));
        })
    }

    /// Mean of `last - first` sighting per member, in seconds
    ///
    /// Entry threshold and window apply; members with a non-positive span
    /// are ignored. Terminals with no qualifying member report 0.0. Does not
    /// touch the cached count.
    pub fn average_dwell_time(&self, window: Option<TimeWindow>) -> ResultTable {
        let thresholds = self.ctx.thresholds();
        let table = tabulate(self.ctx.proximity(), self.ctx.tenants(), |terminal_id, events, row| {
            let threshold = thresholds.threshold(terminal_id, ThresholdRegime::Entry);
            let kept = filter_sightings(terminal_id, events, threshold, window.as_ref());
            let durations: Vec<f64> = member_spans(&kept)
                .values()
                .map(|span| span.duration_secs())
                .filter(|secs| *secs > 0.0)
                .collect();
            row.set(AVERAGE_DWELL_TIME, MetricValue::Real(mean(&durations)));
        });

        info!(terminals = %table.len(), "average_dwell_time_computed");
        table
    }
}

impl FunnelIndicator for VisitIndicator {
    fn name(&self) -> &'static str {
        "VisitIndicator"
    }

    fn stage(&self) -> Stage {
        Stage::Visit
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
            "visit_counted"
        );

        self.last = Some(table.clone());
        Ok(table)
    }

    fn last_count(&self) -> Option<&ResultTable> {
        self.last.as_ref()
    }
}

impl RateIndicator for VisitIndicator {
    /// Pass-by count table
    type Upstream<'a> = &'a ResultTable;

    fn rate(&self, pass_by: Self::Upstream<'_>) -> FunnelResult<ResultTable> {
        rates::visit_rate(self.counted()?, pass_by)
    }
}
