//! Filtering and aggregation shared by all indicators
//!
//! Filtering order per terminal: RSSI threshold (strictly greater than),
//! then undated rows dropped, then the closed time window.

use crate::domain::table::{IndicatorResultRow, ResultTable};
use crate::domain::types::{MemberId, ProximityEvent, TerminalEvent, TerminalId, TimeWindow};
use crate::infra::lookup::TenantMapping;
use crate::services::store::TerminalEventStore;
use chrono::NaiveDateTime;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Keep dated events inside the window (all dated events when `window` is None)
pub fn in_window<'a, E: TerminalEvent>(
    terminal_id: &TerminalId,
    events: impl IntoIterator<Item = &'a E>,
    window: Option<&TimeWindow>,
) -> Vec<&'a E>
where
    E: 'a,
{
    let mut undated = 0usize;
    let kept: Vec<&E> = events
        .into_iter()
        .filter(|e| match e.event_time() {
            Some(t) => window.map_or(true, |w| w.contains(t)),
            None => {
                undated += 1;
                false
            }
        })
        .collect();

    if undated > 0 {
        debug!(terminal = %terminal_id, dropped = %undated, "undated_events_skipped");
    }
    kept
}

/// RSSI threshold (when configured) followed by the window filter
pub fn filter_sightings<'a>(
    terminal_id: &TerminalId,
    events: &'a [ProximityEvent],
    rssi_threshold: Option<f64>,
    window: Option<&TimeWindow>,
) -> Vec<&'a ProximityEvent> {
    let strong = events.iter().filter(|e| rssi_threshold.map_or(true, |t| e.rssi > t));
    in_window(terminal_id, strong, window)
}

pub fn distinct_members(events: &[&ProximityEvent]) -> u64 {
    events.iter().map(|e| &e.member_id).collect::<FxHashSet<_>>().len() as u64
}

/// First and last sighting of one member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberSpan {
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
}

impl MemberSpan {
    /// `last - first` in seconds
    pub fn duration_secs(&self) -> f64 {
        (self.last - self.first).num_milliseconds() as f64 / 1000.0
    }
}

/// Per-member first/last sighting over dated events
pub fn member_spans<'a>(events: &[&'a ProximityEvent]) -> FxHashMap<&'a MemberId, MemberSpan> {
    let mut spans: FxHashMap<&MemberId, MemberSpan> = FxHashMap::default();
    for event in events {
        let Some(t) = event.event_time else { continue };
        spans
            .entry(&event.member_id)
            .and_modify(|span| {
                span.first = span.first.min(t);
                span.last = span.last.max(t);
            })
            .or_insert(MemberSpan { first: t, last: t });
    }
    spans
}

/// Ratio with the engine-wide zero-denominator policy: `x / 0 = 0`
#[inline]
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Median of `values` (0.0 when empty); reorders the slice
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Arithmetic mean (0.0 when empty)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// One result row per terminal in the store, tenant resolved via the mapping
pub fn tabulate<E, F>(
    store: &TerminalEventStore<E>,
    tenants: &TenantMapping,
    mut fill: F,
) -> ResultTable
where
    E: TerminalEvent,
    F: FnMut(&TerminalId, &[E], &mut IndicatorResultRow),
{
    let mut table = ResultTable::new();
    for (terminal_id, events) in store.iter() {
        let mut row = IndicatorResultRow::new(tenants.tenant_for(terminal_id), terminal_id.clone());
        fill(terminal_id, events, &mut row);
        table.push(row);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    fn sighting(member: &str, time: Option<NaiveDateTime>, rssi: f64) -> ProximityEvent {
        ProximityEvent {
            terminal_id: TerminalId::from("T1"),
            member_id: MemberId::from(member),
            event_time: time,
            rssi,
        }
    }

    #[test]
    fn test_filter_sightings_threshold_is_strict() {
        let t1 = TerminalId::from("T1");
        let events = vec![
            sighting("a", Some(at(11, 0, 0)), -60.0),
            sighting("b", Some(at(11, 0, 0)), -59.0),
        ];
        let kept = filter_sightings(&t1, &events, Some(-60.0), None);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].member_id, MemberId::from("b"));

        assert_eq!(filter_sightings(&t1, &events, None, None).len(), 2);
    }

    #[test]
    fn test_filter_sightings_drops_undated_and_out_of_window() {
        let t1 = TerminalId::from("T1");
        let window = TimeWindow::new(at(11, 0, 0), at(12, 0, 0));
        let events = vec![
            sighting("a", Some(at(11, 0, 0)), -50.0),
            sighting("b", Some(at(12, 0, 0)), -50.0),
            sighting("c", Some(at(12, 0, 1)), -50.0),
            sighting("d", None, -50.0),
        ];
        let kept = filter_sightings(&t1, &events, None, Some(&window));
        let members: Vec<&str> = kept.iter().map(|e| e.member_id.0.as_str()).collect();
        assert_eq!(members, vec!["a", "b"]);
    }

    #[test]
    fn test_member_spans_and_distinct() {
        let events = vec![
            sighting("a", Some(at(11, 0, 30)), -50.0),
            sighting("a", Some(at(11, 0, 0)), -50.0),
            sighting("a", Some(at(11, 2, 0)), -50.0),
            sighting("b", Some(at(11, 5, 0)), -50.0),
        ];
        let refs: Vec<&ProximityEvent> = events.iter().collect();
        assert_eq!(distinct_members(&refs), 2);

        let spans = member_spans(&refs);
        assert_eq!(spans[&MemberId::from("a")].duration_secs(), 120.0);
        assert_eq!(spans[&MemberId::from("b")].duration_secs(), 0.0);
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(3.0, 0.0), 0.0);
        assert_eq!(ratio(0.0, 0.0), 0.0);
        assert_eq!(ratio(3.0, 5.0), 0.6);
    }

    #[test]
    fn test_median_and_mean() {
        assert_eq!(median(&mut []), 0.0);
        assert_eq!(median(&mut [5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[10.0, 20.0]), 15.0);
    }
}
