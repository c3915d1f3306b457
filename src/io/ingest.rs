//! Conversion of raw tables into typed events and lookup tables
//!
//! Required columns are checked up front (schema errors are fatal). Row-level
//! problems are recovered here: rows without a usable terminal, member or
//! RSSI are dropped, and unparsable timestamps are kept as `None` so the
//! windowed filters can drop them later.

use crate::domain::types::{MemberId, ProximityEvent, TerminalId, TransactionEvent};
use crate::error::FunnelResult;
use crate::infra::lookup::{RssiThresholds, TenantMapping, ThresholdConfig};
use crate::io::raw_table::{cell_f64, cell_is_blank, cell_str, RawTable};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

pub const PROXIMITY_COLUMNS: [&str; 4] = ["terminalId", "memberId", "eventTime", "rssi"];
pub const TRANSACTION_COLUMNS: [&str; 3] = ["terminalId", "tenantName", "eventTime"];
pub const TENANT_MAPPING_COLUMNS: [&str; 2] = ["terminalId", "tenantName"];
pub const THRESHOLD_COLUMNS: [&str; 3] =
    ["terminalId", "pass_by_rssi_threshold", "entry_rssi_threshold"];

/// Naive formats tried in order; `%.f` makes fractional seconds optional
const NAIVE_FORMATS: [&str; 3] =
    ["%Y-%m-%d %H:%M:%S%.f", "%Y/%m/%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Timestamp cell - can be a text timestamp or epoch milliseconds
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TimestampValue {
    #[default]
    None,
    Text(String),
    EpochMs(i64),
}

impl From<Option<&Value>> for TimestampValue {
    fn from(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(s)) => TimestampValue::Text(s.trim().to_string()),
            Some(Value::Number(n)) => n.as_i64().map(TimestampValue::EpochMs).unwrap_or_default(),
            _ => TimestampValue::None,
        }
    }
}

/// Parse a timestamp cell into wall-clock time
///
/// Offset-bearing RFC 3339 text and epoch milliseconds are normalized to
/// UTC. Text without an offset is taken as given.
pub fn parse_event_time(ts: &TimestampValue) -> Option<NaiveDateTime> {
    match ts {
        TimestampValue::None => None,
        TimestampValue::EpochMs(ms) => {
            DateTime::<Utc>::from_timestamp_millis(*ms).map(|dt| dt.naive_utc())
        }
        TimestampValue::Text(s) => NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())),
    }
}

#[derive(Debug, Default)]
struct IngestStats {
    kept: usize,
    dropped: usize,
    bad_timestamps: usize,
}

impl IngestStats {
    fn report(&self, table: &str) {
        if self.dropped > 0 || self.bad_timestamps > 0 {
            warn!(
                table = %table,
                kept = %self.kept,
                dropped = %self.dropped,
                bad_timestamps = %self.bad_timestamps,
                "ingest_rows_rejected"
            );
        }
        info!(table = %table, rows = %self.kept, "table_ingested");
    }
}

/// Build proximity events from a `terminalId, memberId, eventTime, rssi` table
pub fn proximity_events(table: &RawTable) -> FunnelResult<Vec<ProximityEvent>> {
    table.require_columns("proximity", &PROXIMITY_COLUMNS)?;

    let mut stats = IngestStats::default();
    let mut events = Vec::with_capacity(table.len());

    for (i, row) in table.rows().iter().enumerate() {
        let terminal = cell_str(row, "terminalId");
        let member = cell_str(row, "memberId");
        let rssi = cell_f64(row, "rssi");

        let (Some(terminal), Some(member), Some(rssi)) = (terminal, member, rssi) else {
            debug!(row = %i, "proximity_row_dropped");
            stats.dropped += 1;
            continue;
        };

        let event_time = parse_event_time(&TimestampValue::from(row.get("eventTime")));
        if event_time.is_none() {
            stats.bad_timestamps += 1;
        }

        events.push(ProximityEvent {
            terminal_id: TerminalId(terminal),
            member_id: MemberId(member),
            event_time,
            rssi,
        });
        stats.kept += 1;
    }

    stats.report("proximity");
    Ok(events)
}

/// Build transaction events from a `terminalId, tenantName, eventTime` table
pub fn transaction_events(table: &RawTable) -> FunnelResult<Vec<TransactionEvent>> {
    table.require_columns("transaction", &TRANSACTION_COLUMNS)?;

    let mut stats = IngestStats::default();
    let mut events = Vec::with_capacity(table.len());

    for (i, row) in table.rows().iter().enumerate() {
        let Some(terminal) = cell_str(row, "terminalId") else {
            debug!(row = %i, "transaction_row_dropped");
            stats.dropped += 1;
            continue;
        };

        let event_time = parse_event_time(&TimestampValue::from(row.get("eventTime")));
        if event_time.is_none() {
            stats.bad_timestamps += 1;
        }

        events.push(TransactionEvent {
            terminal_id: TerminalId(terminal),
            tenant_name: cell_str(row, "tenantName").unwrap_or_default(),
            event_time,
        });
        stats.kept += 1;
    }

    stats.report("transaction");
    Ok(events)
}

/// Build a tenant mapping from a `terminalId, tenantName` table
///
/// Later rows win when a terminal appears twice.
pub fn tenant_mapping_from_table(table: &RawTable) -> FunnelResult<TenantMapping> {
    table.require_columns("tenant_mapping", &TENANT_MAPPING_COLUMNS)?;

    let mapping: TenantMapping = table
        .rows()
        .iter()
        .filter_map(|row| {
            let terminal = cell_str(row, "terminalId")?;
            let tenant = cell_str(row, "tenantName")?;
            Some((TerminalId(terminal), tenant))
        })
        .collect();

    info!(terminals = %mapping.len(), "tenant_mapping_loaded");
    Ok(mapping)
}

/// Build RSSI thresholds from a
/// `terminalId, pass_by_rssi_threshold, entry_rssi_threshold` table
///
/// Empty cells mean no filtering in that regime for that terminal. A cell
/// that is present but not a number is logged and treated as empty.
pub fn threshold_config_from_table(table: &RawTable) -> FunnelResult<ThresholdConfig> {
    table.require_columns("rssi_thresholds", &THRESHOLD_COLUMNS)?;

    let thresholds: ThresholdConfig = table
        .rows()
        .iter()
        .filter_map(|row| {
            let terminal = cell_str(row, "terminalId")?;
            let entry = RssiThresholds {
                pass_by: threshold_cell(row, &terminal, "pass_by_rssi_threshold"),
                entry: threshold_cell(row, &terminal, "entry_rssi_threshold"),
            };
            Some((TerminalId(terminal), entry))
        })
        .collect();

    info!(terminals = %thresholds.len(), "rssi_thresholds_loaded");
    Ok(thresholds)
}

fn threshold_cell(row: &Map<String, Value>, terminal: &str, column: &str) -> Option<f64> {
    if cell_is_blank(row, column) {
        return None;
    }
    let value = cell_f64(row, column);
    if value.is_none() {
        warn!(
            terminal = %terminal,
            column = %column,
            value = %row.get(column).map(serde_json::Value::to_string).unwrap_or_default(),
            "rssi_threshold_unparsable"
        );
    }
    value
}
