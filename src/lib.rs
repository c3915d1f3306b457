//! Retail funnel indicator engine
//!
//! Turns cleaned BLE proximity and POS transaction tables into per-terminal
//! pass-by, visit, dwell and bagging counts, and composes them into rates.

pub mod domain;
pub mod error;
pub mod infra;
pub mod io;
pub mod services;
