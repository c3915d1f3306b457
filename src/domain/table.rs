//! Indicator result tables
//!
//! Every `count()`/`rate()` call produces a `ResultTable`: one row per
//! terminal, keyed by `(tenantName, terminalId)`, carrying an ordered list of
//! named metric columns. Column names and the `_<threshold>` suffix are the
//! contract the reporting layer reads.

use crate::domain::types::TerminalId;
use crate::error::{FunnelError, FunnelResult};
use rustc_hash::FxHashMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

pub const PASS_BY_COUNT: &str = "passByCount";
pub const VISIT_COUNT: &str = "visitCount";
pub const VISIT_RATE: &str = "visitRate";
pub const DWELL_MEDIAN: &str = "dwellMedian";
pub const BAGGING_COUNT: &str = "baggingCount";
pub const BAGGING_RATE_VISIT: &str = "baggingRate_visit";
pub const AVERAGE_DWELL_TIME: &str = "averageDwellTime";

const DWELL_COUNT_PREFIX: &str = "dwellCount_";
const DWELL_RATE_PREFIX: &str = "dwellRate_";
const BAGGING_RATE_PREFIX: &str = "baggingRate_";

pub fn dwell_count_column(threshold_secs: u64) -> String {
    format!("{DWELL_COUNT_PREFIX}{threshold_secs}")
}

pub fn dwell_rate_column(threshold_secs: u64) -> String {
    format!("{DWELL_RATE_PREFIX}{threshold_secs}")
}

pub fn bagging_rate_column(suffix: &str) -> String {
    format!("{BAGGING_RATE_PREFIX}{suffix}")
}

/// Threshold suffix of a `dwellCount_<t>` column, if `column` is one
pub fn dwell_count_suffix(column: &str) -> Option<&str> {
    column.strip_prefix(DWELL_COUNT_PREFIX).filter(|s| !s.is_empty())
}

/// A single metric cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Count(u64),
    Real(f64),
}

impl MetricValue {
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match *self {
            MetricValue::Count(n) => n as f64,
            MetricValue::Real(x) => x,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match *self {
            MetricValue::Count(n) => Some(n),
            MetricValue::Real(_) => None,
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            MetricValue::Count(n) => serializer.serialize_u64(n),
            MetricValue::Real(x) => serializer.serialize_f64(x),
        }
    }
}

/// One terminal's metrics for one indicator
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorResultRow {
    pub tenant_name: String,
    pub terminal_id: TerminalId,
    metrics: Vec<(String, MetricValue)>,
}

impl IndicatorResultRow {
    pub fn new(tenant_name: &str, terminal_id: TerminalId) -> Self {
        Self { tenant_name: tenant_name.to_string(), terminal_id, metrics: Vec::with_capacity(4) }
    }

    pub fn with_metric(mut self, name: &str, value: MetricValue) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or overwrite a metric, keeping first-insertion column order
    pub fn set(&mut self, name: &str, value: MetricValue) {
        match self.metrics.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.metrics.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<MetricValue> {
        self.metrics.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&str, MetricValue)> {
        self.metrics.iter().map(|(n, v)| (n.as_str(), *v))
    }

    fn key(&self) -> (&str, &TerminalId) {
        (self.tenant_name.as_str(), &self.terminal_id)
    }
}

impl Serialize for IndicatorResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.metrics.len() + 2))?;
        map.serialize_entry("tenantName", &self.tenant_name)?;
        map.serialize_entry("terminalId", &self.terminal_id)?;
        for (name, value) in &self.metrics {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Collection of result rows, one per terminal
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<IndicatorResultRow>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<IndicatorResultRow>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: IndicatorResultRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[IndicatorResultRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [IndicatorResultRow] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find(&self, tenant_name: &str, terminal_id: &TerminalId) -> Option<&IndicatorResultRow> {
        self.rows.iter().find(|r| r.tenant_name == tenant_name && &r.terminal_id == terminal_id)
    }

    /// Union of metric column names in first-seen order
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            for (name, _) in row.metrics() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Fail with a schema error if any row lacks `column`
    ///
    /// An empty table carries no schema and always passes.
    pub fn require_column(&self, table: &str, column: &str) -> FunnelResult<()> {
        if self.rows.iter().all(|r| r.get(column).is_some()) {
            Ok(())
        } else {
            Err(FunnelError::schema(table, column))
        }
    }

    /// Inner join on `(tenantName, terminalId)`
    ///
    /// Rows present on only one side are dropped. Output follows the order of
    /// `self`; on a column-name clash the left value wins.
    pub fn inner_join(&self, other: &ResultTable) -> ResultTable {
        let index: FxHashMap<(&str, &TerminalId), &IndicatorResultRow> =
            other.rows.iter().map(|r| (r.key(), r)).collect();

        let rows = self
            .rows
            .iter()
            .filter_map(|left| {
                let right = index.get(&left.key())?;
                let mut merged = left.clone();
                for (name, value) in right.metrics() {
                    if merged.get(name).is_none() {
                        merged.metrics.push((name.to_string(), value));
                    }
                }
                Some(merged)
            })
            .collect();

        ResultTable { rows }
    }

    /// Render as a JSON array of flat records
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }
}
