//! Domain models - event rows and indicator result tables
//!
//! This module contains the canonical data types used throughout the engine:
//! - `ProximityEvent` / `TransactionEvent` - cleaned input rows
//! - `TimeWindow` - closed interval used to slice a batch
//! - `ResultTable` - per-terminal metric rows produced by every indicator

pub mod table;
pub mod types;

pub use table::{IndicatorResultRow, MetricValue, ResultTable};
pub use types::{
    MemberId, ProximityEvent, Stage, TerminalEvent, TerminalId, TimeWindow, TransactionEvent,
    UNKNOWN_TENANT,
};
