//! Funnel indicator contract
//!
//! RULE: `count()` returns its table AND caches it. `rate()` composes the
//! cached table with sibling tables passed in explicitly, and fails with a
//! state error if nothing has been counted yet. Stateless callers can use
//! the pure functions in `services::rates` instead.

use crate::domain::table::ResultTable;
use crate::domain::types::{Stage, TimeWindow};
use crate::error::{FunnelError, FunnelResult};
use std::str::FromStr;

/// Counting algorithm variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Algorithm {
    /// Threshold + time-window filter with per-member aggregation
    #[default]
    Simple,
    /// Fixed alternative filter; ignores window and thresholds
    Advanced,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Simple => "simple",
            Algorithm::Advanced => "advanced",
        }
    }
}

impl FromStr for Algorithm {
    type Err = FunnelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Algorithm::Simple),
            "advanced" => Ok(Algorithm::Advanced),
            _ => Err(FunnelError::UnsupportedMethod { method: s.to_string() }),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The contract every funnel stage fulfils.
pub trait FunnelIndicator {
    /// Stable name used in logs and state errors
    fn name(&self) -> &'static str;

    fn stage(&self) -> Stage;

    /// Compute this stage's metric for every terminal in the input store.
    ///
    /// `window` of `None` covers the whole batch. The returned table is also
    /// cached for `rate()`, replacing any earlier result.
    fn count(&mut self, algorithm: Algorithm, window: Option<TimeWindow>)
        -> FunnelResult<ResultTable>;

    /// Last table produced by `count()`, if any
    fn last_count(&self) -> Option<&ResultTable>;

    /// Cached count or a state error
    fn counted(&self) -> FunnelResult<&ResultTable> {
        self.last_count().ok_or(FunnelError::State { indicator: self.name() })
    }

    /// `count()` with the algorithm given by name
    fn count_by_name(
        &mut self,
        method: &str,
        window: Option<TimeWindow>,
    ) -> FunnelResult<ResultTable> {
        let algorithm: Algorithm = method.parse()?;
        self.count(algorithm, window)
    }
}

/// Stages that compose their count against earlier stages
pub trait RateIndicator: FunnelIndicator {
    /// Sibling count tables this stage divides by
    type Upstream<'a>;

    fn rate(&self, upstream: Self::Upstream<'_>) -> FunnelResult<ResultTable>;
}
