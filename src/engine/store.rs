//! Single-writer store around the reducer.
//!
//! Stamps events with the injected clock, applies them, and logs what
//! happened. All mutation of a [`TrackerState`] goes through here.

use super::events::{Event, Notice};
use super::reducer::{reduce, ReducerOutput};
use super::state::{TrackedPattern, TrackerState};
use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::logging;
use crate::pattern::DetectedPattern;
use crate::stats::{self, AccuracyStats, ResultFilter};

pub struct PatternStore<C: Clock = SystemClock> {
    state: TrackerState,
    cfg: TrackerConfig,
    clock: C,
}

impl PatternStore<SystemClock> {
    pub fn new(cfg: TrackerConfig) -> Self {
        Self::with_clock(cfg, SystemClock)
    }
}

impl<C: Clock> PatternStore<C> {
    pub fn with_clock(cfg: TrackerConfig, clock: C) -> Self {
        Self {
            state: TrackerState::new(),
            cfg,
            clock,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.cfg.instrument
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn entries(&self) -> &[TrackedPattern] {
        &self.state.entries
    }

    pub fn get(&self, id: &str) -> Option<&TrackedPattern> {
        self.state.get(id)
    }

    /// Start tracking every qualifying pattern not already tracked.
    pub fn intake(&mut self, patterns: Vec<DetectedPattern>, price: f64) -> Result<Vec<Notice>, TrackerError> {
        let ts = self.clock.now_ms();
        self.apply(Event::Intake { ts, price, patterns })
    }

    /// Resolve pending entries against `price`.
    pub fn tick(&mut self, price: f64) -> Result<Vec<Notice>, TrackerError> {
        let ts = self.clock.now_ms();
        self.apply(Event::Tick { ts, price })
    }

    /// Returns the number of entries removed.
    pub fn clear_resolved(&mut self) -> usize {
        let ts = self.clock.now_ms();
        match self.apply(Event::ClearResolved { ts }) {
            Ok(notices) => notices
                .iter()
                .map(|n| match n {
                    Notice::Cleared { removed } => *removed,
                    _ => 0,
                })
                .sum(),
            Err(_) => 0,
        }
    }

    /// Returns whether an entry with `id` existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let ts = self.clock.now_ms();
        match self.apply(Event::Remove { ts, id: id.to_string() }) {
            Ok(notices) => !notices.is_empty(),
            Err(_) => false,
        }
    }

    pub fn stats(&self) -> AccuracyStats {
        stats::compute(&self.state.entries)
    }

    pub fn filter(&self, by: ResultFilter) -> Vec<&TrackedPattern> {
        stats::filter(&self.state.entries, by)
    }

    pub fn recent_resolved(&self, n: usize) -> Vec<&TrackedPattern> {
        stats::recent_resolved(&self.state.entries, n)
    }

    /// Apply a pre-stamped event. Used by replay, where timestamps come from the feed.
    pub fn apply(&mut self, event: Event) -> Result<Vec<Notice>, TrackerError> {
        let op = event.kind();
        match reduce(&mut self.state, event, &self.cfg) {
            Ok(ReducerOutput { notices, state_hash }) => {
                for notice in &notices {
                    log_notice(notice);
                }
                logging::log_audit(op, self.state.seq, state_hash);
                Ok(notices)
            }
            Err(err) => {
                logging::log_rejected(op, &err);
                Err(err)
            }
        }
    }
}

fn log_notice(notice: &Notice) {
    match notice {
        Notice::Tracked {
            id,
            pattern_id,
            entry_price,
            target_price,
            stop_loss,
        } => logging::log_tracked(id, pattern_id, *entry_price, *target_price, *stop_loss),
        Notice::Resolved {
            id,
            outcome,
            price,
            pnl_percent,
            resolved_at,
        } => logging::log_resolved(id, outcome.as_str(), *price, *pnl_percent, *resolved_at),
        Notice::Dropped { pattern_id, reason } => logging::log_dropped(pattern_id, reason),
        Notice::Cleared { removed } => logging::log_cleared(*removed),
        Notice::Removed { id } => logging::log_removed(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::state::Outcome;
    use crate::pattern::Signal;

    fn store() -> (PatternStore<ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_000);
        (PatternStore::with_clock(TrackerConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn test_timestamps_come_from_clock() {
        let (mut store, clock) = store();
        store
            .intake(vec![DetectedPattern::new("p1", "Flag", Signal::Bullish, 0.8)], 100.0)
            .unwrap();
        clock.advance(250);
        store.tick(104.5).unwrap();

        let e = store.get("track-p1").unwrap();
        assert_eq!(e.tracked_at, 1_000);
        assert_eq!(e.resolved_at, Some(1_250));
        assert_eq!(e.result, Outcome::Success);
    }

    #[test]
    fn test_clear_resolved_reports_count() {
        let (mut store, _) = store();
        store
            .intake(
                vec![
                    DetectedPattern::new("a", "Flag", Signal::Bullish, 0.8),
                    DetectedPattern::new("b", "Wedge", Signal::Bearish, 0.8),
                ],
                100.0,
            )
            .unwrap();
        store.tick(98.0).unwrap();

        assert_eq!(store.clear_resolved(), 1);
        assert_eq!(store.clear_resolved(), 0);
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.entries()[0].id, "track-b");
    }

    #[test]
    fn test_remove_regardless_of_result() {
        let (mut store, _) = store();
        store
            .intake(vec![DetectedPattern::new("a", "Flag", Signal::Bullish, 0.8)], 100.0)
            .unwrap();
        assert!(store.remove("track-a"));
        assert!(!store.remove("track-a"));
        assert!(store.entries().is_empty());
    }

    #[test]
    fn test_remove_unknown_leaves_state_untouched() {
        let (mut store, _) = store();
        store
            .intake(vec![DetectedPattern::new("a", "Flag", Signal::Bullish, 0.8)], 100.0)
            .unwrap();
        let (seq, hash) = (store.state().seq, store.state().hash());
        assert!(!store.remove("track-nope"));
        assert_eq!(store.state().seq, seq);
        assert_eq!(store.state().hash(), hash);
    }

    #[test]
    fn test_out_of_order_feed_keeps_stamps_monotonic() {
        let (mut store, _) = store();
        store
            .apply(Event::Intake {
                ts: 5_000,
                price: 100.0,
                patterns: vec![DetectedPattern::new("a", "Flag", Signal::Bullish, 0.8)],
            })
            .unwrap();
        store.apply(Event::Tick { ts: 1_000, price: 105.0 }).unwrap();

        let e = store.get("track-a").unwrap();
        assert_eq!(e.result, Outcome::Success);
        assert!(e.resolved_at.unwrap() >= e.tracked_at);
    }

    #[test]
    fn test_filter_and_instrument() {
        let (mut store, _) = store();
        store
            .intake(
                vec![
                    DetectedPattern::new("a", "Flag", Signal::Bullish, 0.8),
                    DetectedPattern::new("b", "Wedge", Signal::Bearish, 0.8),
                ],
                100.0,
            )
            .unwrap();
        store.tick(98.0).unwrap();

        assert_eq!(store.instrument(), "BTCUSDT");
        let failed: Vec<&str> = store.filter(ResultFilter::Failure).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(failed, vec!["track-a"]);
        assert_eq!(store.filter(ResultFilter::Pending).len(), 1);
        assert_eq!(store.filter(ResultFilter::All).len(), 2);
    }

    #[test]
    fn test_rejected_tick_reports_error() {
        let (mut store, _) = store();
        let err = store.tick(0.0).unwrap_err();
        assert_eq!(err, TrackerError::InvalidPriceTick { price: 0.0 });
        assert_eq!(store.state().seq, 0);
    }
}
