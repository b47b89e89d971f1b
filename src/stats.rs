//! Accuracy statistics and list selectors over tracked patterns.
//!
//! Everything here is a pure function of the entry slice: no caching, no
//! mutation, safe to call on every render.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MIN_TRACK_CONFIDENCE;
use crate::engine::state::{Outcome, TrackedPattern};
use crate::pattern::Signal;

/// `success / resolved * 100`, or 0 when nothing has resolved.
pub fn win_rate(success: usize, resolved: usize) -> f64 {
    if resolved > 0 {
        success as f64 / resolved as f64 * 100.0
    } else {
        0.0
    }
}

/// Confidence buckets used for the per-band breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceBand {
    /// [0.90, 1.00]
    High,
    /// [0.80, 0.90)
    Medium,
    /// [0.75, 0.80)
    Low,
}

impl ConfidenceBand {
    pub const ALL: [ConfidenceBand; 3] = [ConfidenceBand::High, ConfidenceBand::Medium, ConfidenceBand::Low];

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "90-100%",
            ConfidenceBand::Medium => "80-90%",
            ConfidenceBand::Low => "75-80%",
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        match self {
            ConfidenceBand::High => (0.9, 1.0),
            ConfidenceBand::Medium => (0.8, 0.9),
            ConfidenceBand::Low => (MIN_TRACK_CONFIDENCE, 0.8),
        }
    }

    /// Half-open `[min, max)`, except the top band which includes 1.0.
    pub fn contains(&self, confidence: f64) -> bool {
        let (min, max) = self.bounds();
        match self {
            ConfidenceBand::High => confidence >= min && confidence <= max,
            _ => confidence >= min && confidence < max,
        }
    }

    pub fn of(confidence: f64) -> Option<ConfidenceBand> {
        Self::ALL.into_iter().find(|b| b.contains(confidence))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub pattern_type: String,
    pub total: usize,
    pub resolved: usize,
    pub success: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub signal: Signal,
    pub total: usize,
    pub resolved: usize,
    pub success: usize,
    pub failure: usize,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandBreakdown {
    pub band: ConfidenceBand,
    pub label: String,
    pub total: usize,
    pub resolved: usize,
    pub success: usize,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub total: usize,
    pub pending: usize,
    pub success: usize,
    pub failure: usize,
    pub resolved: usize,
    pub win_rate: f64,
    /// Mean `pnl_percent` over resolved entries
    pub avg_pnl: f64,
    /// Sorted by pattern type
    pub by_type: Vec<TypeBreakdown>,
    /// Bullish, Bearish, Neutral
    pub by_signal: Vec<SignalBreakdown>,
    /// High, Medium, Low
    pub by_band: Vec<BandBreakdown>,
}

#[derive(Default)]
struct Tally {
    total: usize,
    success: usize,
    failure: usize,
    pnl_sum: f64,
}

impl Tally {
    fn add(&mut self, e: &TrackedPattern) {
        self.total += 1;
        match e.result {
            Outcome::Success => self.success += 1,
            Outcome::Failure => self.failure += 1,
            Outcome::Pending => return,
        }
        self.pnl_sum += e.pnl_percent;
    }

    fn resolved(&self) -> usize {
        self.success + self.failure
    }

    fn avg_pnl(&self) -> f64 {
        match self.resolved() {
            0 => 0.0,
            n => self.pnl_sum / n as f64,
        }
    }
}

pub fn compute(entries: &[TrackedPattern]) -> AccuracyStats {
    let mut all = Tally::default();
    let mut types: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut signals: [Tally; 3] = Default::default();
    let mut bands: [Tally; 3] = Default::default();

    for e in entries {
        all.add(e);
        types.entry(e.pattern.pattern_type.as_str()).or_default().add(e);
        if let Some(i) = Signal::ALL.iter().position(|s| *s == e.pattern.signal) {
            signals[i].add(e);
        }
        if let Some(i) = ConfidenceBand::ALL.iter().position(|b| b.contains(e.pattern.confidence)) {
            bands[i].add(e);
        }
    }

    let by_type = types
        .into_iter()
        .map(|(t, tally)| TypeBreakdown {
            pattern_type: t.to_string(),
            total: tally.total,
            resolved: tally.resolved(),
            success: tally.success,
            win_rate: win_rate(tally.success, tally.resolved()),
            avg_pnl: tally.avg_pnl(),
        })
        .collect();

    let by_signal = Signal::ALL
        .iter()
        .zip(signals.iter())
        .map(|(signal, tally)| SignalBreakdown {
            signal: *signal,
            total: tally.total,
            resolved: tally.resolved(),
            success: tally.success,
            failure: tally.resolved() - tally.success,
            win_rate: win_rate(tally.success, tally.resolved()),
        })
        .collect();

    let by_band = ConfidenceBand::ALL
        .iter()
        .zip(bands.iter())
        .map(|(band, tally)| BandBreakdown {
            band: *band,
            label: band.label().to_string(),
            total: tally.total,
            resolved: tally.resolved(),
            success: tally.success,
            win_rate: win_rate(tally.success, tally.resolved()),
        })
        .collect();

    AccuracyStats {
        total: all.total,
        pending: all.total - all.resolved(),
        success: all.success,
        failure: all.failure,
        resolved: all.resolved(),
        win_rate: win_rate(all.success, all.resolved()),
        avg_pnl: all.avg_pnl(),
        by_type,
        by_signal,
        by_band,
    }
}

/// Tabs of the tracked-pattern list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultFilter {
    All,
    Pending,
    Resolved,
    Success,
    Failure,
}

impl ResultFilter {
    pub fn matches(&self, outcome: Outcome) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::Pending => outcome == Outcome::Pending,
            ResultFilter::Resolved => outcome.is_resolved(),
            ResultFilter::Success => outcome == Outcome::Success,
            ResultFilter::Failure => outcome == Outcome::Failure,
        }
    }
}

pub fn filter(entries: &[TrackedPattern], by: ResultFilter) -> Vec<&TrackedPattern> {
    entries.iter().filter(|e| by.matches(e.result)).collect()
}

/// Resolved entries, most recently resolved first.
pub fn recent_resolved(entries: &[TrackedPattern], n: usize) -> Vec<&TrackedPattern> {
    let mut resolved: Vec<&TrackedPattern> = entries.iter().filter(|e| e.resolved_at.is_some()).collect();
    // Stable sort keeps tracking order among equal stamps
    resolved.sort_by(|a, b| b.resolved_at.cmp(&a.resolved_at));
    resolved.truncate(n);
    resolved
}
