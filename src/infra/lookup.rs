//! Static lookup tables handed to indicators at construction
//!
//! - `TenantMapping` - terminalId -> tenantName
//! - `ThresholdConfig` - terminalId -> pass-by / entry RSSI thresholds
//! - `DwellThresholdSet` - ordered dwell-duration thresholds (seconds)

use crate::domain::types::{TerminalId, UNKNOWN_TENANT};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Default dwell thresholds in seconds
pub const DEFAULT_DWELL_THRESHOLDS: [u64; 3] = [60, 180, 300];

/// terminalId -> tenantName lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantMapping {
    tenants: HashMap<TerminalId, String>,
}

impl TenantMapping {
    pub fn new(tenants: HashMap<TerminalId, String>) -> Self {
        Self { tenants }
    }

    /// Tenant for a terminal, or `"Unknown"` when unmapped
    pub fn tenant_for(&self, terminal_id: &TerminalId) -> &str {
        self.tenants.get(terminal_id).map(String::as_str).unwrap_or(UNKNOWN_TENANT)
    }

    pub fn contains(&self, terminal_id: &TerminalId) -> bool {
        self.tenants.contains_key(terminal_id)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

impl FromIterator<(TerminalId, String)> for TenantMapping {
    fn from_iter<I: IntoIterator<Item = (TerminalId, String)>>(iter: I) -> Self {
        Self { tenants: iter.into_iter().collect() }
    }
}

/// RSSI thresholds (dBm) for one terminal; `None` disables filtering in that regime
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RssiThresholds {
    pub pass_by: Option<f64>,
    pub entry: Option<f64>,
}

/// Which threshold regime a filter applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdRegime {
    /// Coarse, weakest filter (funnel top)
    PassBy,
    /// Tighter filter, stronger signal required
    Entry,
}

/// Per-terminal RSSI thresholds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdConfig {
    thresholds: HashMap<TerminalId, RssiThresholds>,
}

impl ThresholdConfig {
    pub fn new(thresholds: HashMap<TerminalId, RssiThresholds>) -> Self {
        Self { thresholds }
    }

    pub fn get(&self, terminal_id: &TerminalId) -> Option<&RssiThresholds> {
        self.thresholds.get(terminal_id)
    }

    /// Threshold for a terminal in the given regime, if one is configured
    pub fn threshold(&self, terminal_id: &TerminalId, regime: ThresholdRegime) -> Option<f64> {
        let entry = self.thresholds.get(terminal_id)?;
        match regime {
            ThresholdRegime::PassBy => entry.pass_by,
            ThresholdRegime::Entry => entry.entry,
        }
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

impl FromIterator<(TerminalId, RssiThresholds)> for ThresholdConfig {
    fn from_iter<I: IntoIterator<Item = (TerminalId, RssiThresholds)>>(iter: I) -> Self {
        Self { thresholds: iter.into_iter().collect() }
    }
}

/// Ordered dwell-duration thresholds in seconds
///
/// Order is the caller's; each threshold yields its own
/// `dwellCount_<t>` / `dwellRate_<t>` / `baggingRate_<t>` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwellThresholdSet {
    secs: SmallVec<[u64; 4]>,
}

impl DwellThresholdSet {
    /// Duplicates are dropped, first occurrence wins
    pub fn new(thresholds: &[u64]) -> Self {
        let mut secs: SmallVec<[u64; 4]> = SmallVec::new();
        for &t in thresholds {
            if !secs.contains(&t) {
                secs.push(t);
            }
        }
        Self { secs }
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.secs.iter().copied()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.secs
    }

    pub fn len(&self) -> usize {
        self.secs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secs.is_empty()
    }
}

impl Default for DwellThresholdSet {
    fn default() -> Self {
        Self::new(&DEFAULT_DWELL_THRESHOLDS)
    }
}
