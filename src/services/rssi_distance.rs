//! RSSI to distance conversion strategies
//!
//! Used when deriving per-terminal RSSI thresholds from a target radius. The
//! funnel indicators themselves filter on raw RSSI and never call these.

use crate::error::{FunnelError, FunnelResult};
use anyhow::anyhow;
use std::collections::BTreeMap;

/// Reference RSSI at one meter (dBm)
pub const DEFAULT_RSSI_AT_1M: f64 = -40.0;
pub const FREE_SPACE_EXPONENT: f64 = 2.0;
pub const LOG_DISTANCE_EXPONENT: f64 = 3.0;

/// Signal strength (dBm) to estimated distance (meters)
pub trait RssiDistanceModel: Send + Sync {
    fn convert(&self, rssi: f64) -> f64;
}

/// Nearest-key match against a calibration table
///
/// Equally close keys resolve to the lowest key.
#[derive(Debug, Clone)]
pub struct LookupTableModel {
    table: BTreeMap<i32, f64>,
}

impl LookupTableModel {
    pub fn new(table: BTreeMap<i32, f64>) -> FunnelResult<Self> {
        if table.is_empty() {
            return Err(FunnelError::Config(anyhow!("rssi lookup table is empty")));
        }
        Ok(Self { table })
    }
}

impl RssiDistanceModel for LookupTableModel {
    fn convert(&self, rssi: f64) -> f64 {
        let mut best: Option<(f64, f64)> = None;
        // ascending key order; strict < keeps the lowest key on ties
        for (&key, &distance) in &self.table {
            let diff = (f64::from(key) - rssi).abs();
            if best.map_or(true, |(d, _)| diff < d) {
                best = Some((diff, distance));
            }
        }
        // table is non-empty, so a match always exists
        best.map_or(f64::NAN, |(_, distance)| distance)
    }
}

/// `distance = 10^((rssi_at_1m - rssi) / (10 * exponent))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathLossModel {
    rssi_at_1m: f64,
    exponent: f64,
}

impl PathLossModel {
    pub fn new(rssi_at_1m: f64, exponent: f64) -> Self {
        Self { rssi_at_1m, exponent }
    }

    pub fn free_space() -> Self {
        Self::new(DEFAULT_RSSI_AT_1M, FREE_SPACE_EXPONENT)
    }

    pub fn log_distance() -> Self {
        Self::new(DEFAULT_RSSI_AT_1M, LOG_DISTANCE_EXPONENT)
    }

    pub fn rssi_at_1m(&self) -> f64 {
        self.rssi_at_1m
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    /// Expected RSSI at `distance` meters; inverse of `convert`
    pub fn rssi_at(&self, distance: f64) -> f64 {
        self.rssi_at_1m - 10.0 * self.exponent * distance.log10()
    }
}

impl RssiDistanceModel for PathLossModel {
    fn convert(&self, rssi: f64) -> f64 {
        10f64.powf((self.rssi_at_1m - rssi) / (10.0 * self.exponent))
    }
}

/// Externally trained regressor, treated as an opaque function
pub struct LearnedModel {
    predict: Box<dyn Fn(f64) -> f64 + Send + Sync>,
}

impl LearnedModel {
    pub fn new<F>(predict: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self { predict: Box::new(predict) }
    }
}

impl std::fmt::Debug for LearnedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearnedModel").finish_non_exhaustive()
    }
}

impl RssiDistanceModel for LearnedModel {
    fn convert(&self, rssi: f64) -> f64 {
        (self.predict)(rssi)
    }
}

/// Holds whichever model the caller picked
pub struct RssiDistanceConverter {
    model: Box<dyn RssiDistanceModel>,
}

impl RssiDistanceConverter {
    pub fn new(model: impl RssiDistanceModel + 'static) -> Self {
        Self { model: Box::new(model) }
    }

    pub fn convert(&self, rssi: f64) -> f64 {
        self.model.convert(rssi)
    }

    /// Convert a batch of readings in order
    pub fn convert_all(&self, readings: &[f64]) -> Vec<f64> {
        readings.iter().map(|r| self.model.convert(*r)).collect()
    }
}
