//! Tracker state with deterministic hashing for replay validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::events::Timestamp;
use crate::pattern::DetectedPattern;

/// Resolution status of a tracked pattern. Never returns to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

/// A detected pattern under outcome monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPattern {
    /// `"track-" + pattern.id`
    pub id: String,
    /// Snapshot taken when tracking began
    pub pattern: DetectedPattern,
    pub entry_price: f64,
    /// Frozen at the resolving tick
    pub current_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub result: Outcome,
    pub pnl_percent: f64,
    pub tracked_at: Timestamp,
    /// Present iff `result` is resolved
    pub resolved_at: Option<Timestamp>,
}

impl TrackedPattern {
    pub fn tracking_id(pattern_id: &str) -> String {
        format!("track-{}", pattern_id)
    }

    pub fn is_pending(&self) -> bool {
        self.result == Outcome::Pending
    }
}

/// Complete tracker state - hashable for replay validation
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    /// Current logical time
    pub now: Timestamp,
    /// Sequence number of the last applied event
    pub seq: u64,
    /// Last accepted price
    pub last_price: Option<f64>,
    /// Entries in tracking order
    pub entries: Vec<TrackedPattern>,
    /// Pattern ids currently tracked (dedup index)
    tracked_ids: HashSet<String>,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_tracked(&self, pattern_id: &str) -> bool {
        self.tracked_ids.contains(pattern_id)
    }

    pub fn get(&self, id: &str) -> Option<&TrackedPattern> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub(crate) fn push(&mut self, entry: TrackedPattern) {
        self.tracked_ids.insert(entry.pattern.id.clone());
        self.entries.push(entry);
    }

    /// Drop every entry matching `pred`, keeping the index in sync.
    pub(crate) fn remove_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&TrackedPattern) -> bool,
    {
        let before = self.entries.len();
        let tracked_ids = &mut self.tracked_ids;
        self.entries.retain(|e| {
            if pred(e) {
                tracked_ids.remove(&e.pattern.id);
                false
            } else {
                true
            }
        });
        before - self.entries.len()
    }

    /// Compute deterministic hash of state
    pub fn hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut h = DefaultHasher::new();
        self.now.hash(&mut h);
        self.seq.hash(&mut h);
        self.last_price.map(quantize).hash(&mut h);

        // Entry order is part of the state
        for e in &self.entries {
            e.id.hash(&mut h);
            e.pattern.pattern_type.hash(&mut h);
            e.pattern.signal.hash(&mut h);
            quantize(e.pattern.confidence).hash(&mut h);
            quantize(e.entry_price).hash(&mut h);
            quantize(e.current_price).hash(&mut h);
            quantize(e.target_price).hash(&mut h);
            quantize(e.stop_loss).hash(&mut h);
            e.result.hash(&mut h);
            quantize(e.pnl_percent).hash(&mut h);
            e.tracked_at.hash(&mut h);
            e.resolved_at.hash(&mut h);
        }

        h.finish()
    }
}

// Quantized to avoid float comparison issues
fn quantize(x: f64) -> i64 {
    (x * 1e8) as i64
}
