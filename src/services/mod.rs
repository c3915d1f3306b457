//! Services - funnel computation
//!
//! This module contains the indicator engine:
//! - `store` - Per-terminal event storage and profiling
//! - `context` - Shared immutable inputs handed to every indicator
//! - `aggregate` - Filtering, per-member spans and ratio helpers
//! - `indicator` - The count/rate contract and algorithm selector
//! - `pass_by` / `visit` / `dwell` / `bagging` - The four funnel stages
//! - `rates` - Stage-to-stage rate composition
//! - `rssi_distance` - RSSI to distance conversion strategies

pub mod aggregate;
pub mod bagging;
pub mod context;
pub mod dwell;
pub mod indicator;
pub mod pass_by;
pub mod rates;
pub mod rssi_distance;
pub mod store;
pub mod visit;

// Re-export commonly used types
pub use bagging::BaggingIndicator;
pub use context::FunnelContext;
pub use dwell::DwellIndicator;
pub use indicator::{Algorithm, FunnelIndicator, RateIndicator};
pub use pass_by::PassByIndicator;
pub use rssi_distance::{
    LearnedModel, LookupTableModel, PathLossModel, RssiDistanceConverter, RssiDistanceModel,
};
pub use store::{TerminalEventStore, TerminalProfile};
pub use visit::VisitIndicator;
