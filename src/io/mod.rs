//! IO modules - the cleaning-layer boundary
//!
//! This module contains all input handling:
//! - `raw_table` - Column-named JSON records (array or JSON Lines)
//! - `ingest` - Schema checks and conversion into typed events / lookup tables

pub mod ingest;
pub mod raw_table;

// Re-export commonly used types
pub use ingest::{
    proximity_events, tenant_mapping_from_table, threshold_config_from_table,
    transaction_events,
};
pub use raw_table::RawTable;
