//! Bagging indicator - funnel stage 4
//!
//! Counts purchase events per terminal from the transaction store. A purchase
//! event is a distinct transaction timestamp, so two receipts printed in the
//! same instant at one terminal count once.

use crate::domain::table::{MetricValue, ResultTable, BAGGING_COUNT};
use crate::domain::types::{Stage, TimeWindow};
use crate::error::FunnelResult;
use crate::services::aggregate::{in_window, tabulate};
use crate::services::context::FunnelContext;
use crate::services::indicator::{Algorithm, FunnelIndicator, RateIndicator};
use crate::services::rates;
use chrono::NaiveDateTime;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::info;

pub struct BaggingIndicator {
    ctx: Arc<FunnelContext>,
    last: Option<ResultTable>,
}

impl BaggingIndicator {
    pub fn new(ctx: Arc<FunnelContext>) -> Self {
        Self { ctx, last: None }
    }

    fn count_simple(&self, window: Option<&TimeWindow>) -> ResultTable {
        tabulate(self.ctx.transactions(), self.ctx.tenants(), |terminal_id, events, row| {
            let stamps: FxHashSet<NaiveDateTime> = in_window(terminal_id, events, window)
                .into_iter()
                .filter_map(|e| e.event_time)
                .collect();
            row.set(BAGGING_COUNT, MetricValue::Count(stamps.len() as u64));
        })
    }

    /// Every transaction row, dated or not
    fn count_advanced(&self) -> ResultTable {
        tabulate(self.ctx.transactions(), self.ctx.tenants(), |_, events, row| {
            row.set(BAGGING_COUNT, MetricValue::Count(events.len() as u64));
        })
    }
}

impl FunnelIndicator for BaggingIndicator {
    fn name(&self) -> &'static str {
        "BaggingIndicator"
    }

    fn stage(&self) -> Stage {
        Stage::Bagging
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
            "bagging_counted"
        );

        self.last = Some(table.clone());
        Ok(table)
    }

    fn last_count(&self) -> Option<&ResultTable> {
        self.last.as_ref()
    }
}

impl RateIndicator for BaggingIndicator {
    /// Dwell count table, then visit count table
    type Upstream<'a> = (&'a ResultTable, &'a ResultTable);

    fn rate(&self, upstream: Self::Upstream<'_>) -> FunnelResult<ResultTable> {
        let (dwell, visit) = upstream;
        rates::bagging_rate(self.counted()?, dwell, visit)
    }
}
