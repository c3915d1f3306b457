//! Shared types for the funnel engine

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Tenant name reported for terminals missing from the tenant mapping
pub const UNKNOWN_TENANT: &str = "Unknown";

/// Newtype wrapper for terminal (beacon receiver) IDs
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerminalId(pub String);

impl std::fmt::Display for TerminalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TerminalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Newtype wrapper for shopper (member) IDs
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One beacon sighting
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityEvent {
    pub terminal_id: TerminalId,
    pub member_id: MemberId,
    /// None when the source timestamp could not be parsed
    pub event_time: Option<NaiveDateTime>,
    /// Signal strength in dBm
    pub rssi: f64,
}

/// One point-of-sale transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEvent {
    pub terminal_id: TerminalId,
    pub tenant_name: String,
    pub event_time: Option<NaiveDateTime>,
}

/// Common accessors used by the event store and shared filters
pub trait TerminalEvent {
    fn terminal_id(&self) -> &TerminalId;
    fn event_time(&self) -> Option<NaiveDateTime>;

    /// Member identity, for event kinds that carry one
    fn member_id(&self) -> Option<&MemberId> {
        None
    }
}

impl TerminalEvent for ProximityEvent {
    fn terminal_id(&self) -> &TerminalId {
        &self.terminal_id
    }

    fn event_time(&self) -> Option<NaiveDateTime> {
        self.event_time
    }

    fn member_id(&self) -> Option<&MemberId> {
        Some(&self.member_id)
    }
}

impl TerminalEvent for TransactionEvent {
    fn terminal_id(&self) -> &TerminalId {
        &self.terminal_id
    }

    fn event_time(&self) -> Option<NaiveDateTime> {
        self.event_time
    }
}

/// Closed time interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Boundary instants are inside the window
    #[inline]
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        t >= self.start && t <= self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.time(), self.end.time())
    }
}

/// Funnel stage, top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PassBy,
    Visit,
    Dwell,
    Bagging,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PassBy => "pass_by",
            Stage::Visit => "visit",
            Stage::Dwell => "dwell",
            Stage::Bagging => "bagging",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
