//! Inputs to and outputs from the reducer.

use super::state::Outcome;
use crate::pattern::DetectedPattern;

/// Epoch milliseconds.
pub type Timestamp = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// New detector output observed at `price`.
    Intake {
        ts: Timestamp,
        price: f64,
        patterns: Vec<DetectedPattern>,
    },
    /// Price update; resolves pending entries.
    Tick { ts: Timestamp, price: f64 },
    ClearResolved { ts: Timestamp },
    Remove { ts: Timestamp, id: String },
}

impl Event {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Event::Intake { ts, .. }
            | Event::Tick { ts, .. }
            | Event::ClearResolved { ts }
            | Event::Remove { ts, .. } => *ts,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Intake { .. } => "intake",
            Event::Tick { .. } => "tick",
            Event::ClearResolved { .. } => "clear_resolved",
            Event::Remove { .. } => "remove",
        }
    }
}

/// What a transition did, for the caller to log or display.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Tracked {
        id: String,
        pattern_id: String,
        entry_price: f64,
        target_price: f64,
        stop_loss: f64,
    },
    Resolved {
        id: String,
        outcome: Outcome,
        price: f64,
        pnl_percent: f64,
        resolved_at: Timestamp,
    },
    Dropped { pattern_id: String, reason: String },
    Cleared { removed: usize },
    Removed { id: String },
}
