//! Infrastructure - configuration and static lookup tables
//!
//! This module contains infrastructure concerns:
//! - `config` - Engine configuration (TOML loading, defaults)
//! - `lookup` - Tenant mapping, RSSI thresholds, dwell thresholds

pub mod config;
pub mod lookup;

// Re-export commonly used types
pub use config::EngineConfig;
pub use lookup::{
    DwellThresholdSet, RssiThresholds, TenantMapping, ThresholdConfig, ThresholdRegime,
};
