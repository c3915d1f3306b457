//! Stage-to-stage rate composition
//!
//! Every function inner-joins its inputs on `(tenantName, terminalId)` and
//! appends ratio columns. Terminals missing from any input are dropped.
//! Zero denominators yield 0.0.

use crate::domain::table::{
    bagging_rate_column, dwell_count_column, dwell_count_suffix, dwell_rate_column,
    IndicatorResultRow, MetricValue, ResultTable, BAGGING_COUNT, BAGGING_RATE_VISIT,
    PASS_BY_COUNT, VISIT_COUNT, VISIT_RATE,
};
use crate::error::{FunnelError, FunnelResult};
use crate::infra::lookup::DwellThresholdSet;
use crate::services::aggregate::ratio;
use tracing::debug;

fn metric(row: &IndicatorResultRow, column: &str) -> f64 {
    row.get(column).map(|v| v.as_f64()).unwrap_or(0.0)
}

fn log_dropped(stage: &'static str, left: usize, joined: usize) {
    if joined < left {
        debug!(stage = %stage, dropped = %(left - joined), "rate_join_dropped_terminals");
    }
}

/// `visitRate = visitCount / passByCount`
pub fn visit_rate(visit: &ResultTable, pass_by: &ResultTable) -> FunnelResult<ResultTable> {
    visit.require_column("visit", VISIT_COUNT)?;
    pass_by.require_column("pass_by", PASS_BY_COUNT)?;

    let mut joined = visit.inner_join(pass_by);
    for row in joined.rows_mut() {
        let r = ratio(metric(row, VISIT_COUNT), metric(row, PASS_BY_COUNT));
        row.set(VISIT_RATE, MetricValue::Real(r));
    }

    log_dropped("visit", visit.len(), joined.len());
    Ok(joined)
}

/// `dwellRate_<t> = dwellCount_<t> / visitCount` for each configured threshold
pub fn dwell_rate(
    dwell: &ResultTable,
    visit: &ResultTable,
    thresholds: &DwellThresholdSet,
) -> FunnelResult<ResultTable> {
    let count_columns: Vec<(String, String)> =
        thresholds.iter().map(|t| (dwell_count_column(t), dwell_rate_column(t))).collect();
    for (count_col, _) in &count_columns {
        dwell.require_column("dwell", count_col)?;
    }
    visit.require_column("visit", VISIT_COUNT)?;

    let mut joined = dwell.inner_join(visit);
    for row in joined.rows_mut() {
        let visits = metric(row, VISIT_COUNT);
        for (count_col, rate_col) in &count_columns {
            let r = ratio(metric(row, count_col), visits);
            row.set(rate_col, MetricValue::Real(r));
        }
    }

    log_dropped("dwell", dwell.len(), joined.len());
    Ok(joined)
}

/// `baggingRate_<t> = baggingCount / dwellCount_<t>` for every dwell count
/// column present, plus `baggingRate_visit = baggingCount / visitCount`
pub fn bagging_rate(
    bagging: &ResultTable,
    dwell: &ResultTable,
    visit: &ResultTable,
) -> FunnelResult<ResultTable> {
    bagging.require_column("bagging", BAGGING_COUNT)?;
    visit.require_column("visit", VISIT_COUNT)?;

    let dwell_columns: Vec<(String, String)> = dwell
        .column_names()
        .into_iter()
        .filter_map(|col| Some((col.to_string(), bagging_rate_column(dwell_count_suffix(col)?))))
        .collect();
    // a median-only dwell table has nothing to divide by
    if !dwell.is_empty() && dwell_columns.is_empty() {
        return Err(FunnelError::schema("dwell", "dwellCount_<threshold>"));
    }

    let mut joined = bagging.inner_join(dwell).inner_join(visit);
    for row in joined.rows_mut() {
        let bags = metric(row, BAGGING_COUNT);
        for (count_col, rate_col) in &dwell_columns {
            let r = ratio(bags, metric(row, count_col));
            row.set(rate_col, MetricValue::Real(r));
        }
        let r = ratio(bags, metric(row, VISIT_COUNT));
        row.set(BAGGING_RATE_VISIT, MetricValue::Real(r));
    }

    log_dropped("bagging", bagging.len(), joined.len());
    Ok(joined)
}
