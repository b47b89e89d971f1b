//! Pure reducer: (State, Event) -> (State, Vec<Notice>)
//!
//! All tracker transitions happen here. Prices are validated before any
//! entry is touched, so a rejected event leaves the state exactly as it was.

use super::events::*;
use super::state::*;
use crate::config::TrackerConfig;
use crate::error::{check_price, TrackerError};
use crate::pattern::DetectedPattern;

/// Result of processing an event
#[derive(Debug, Clone, PartialEq)]
pub struct ReducerOutput {
    pub notices: Vec<Notice>,
    pub state_hash: u64,
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn pnl_percent(entry_price: f64, price: f64) -> f64 {
    round2((price - entry_price) / entry_price * 100.0)
}

/// Target and stop for a pattern entered at `price`.
pub fn levels_for(pattern: &DetectedPattern, price: f64, cfg: &TrackerConfig) -> (f64, f64) {
    let reach = cfg.target_base_pct + pattern.confidence * cfg.target_confidence_pct;
    let (target_multiplier, stop_multiplier) = if pattern.signal.is_bullish() {
        (1.0 + reach, 1.0 - cfg.stop_pct)
    } else {
        (1.0 - reach, 1.0 + cfg.stop_pct)
    };
    (round2(price * target_multiplier), round2(price * stop_multiplier))
}

/// Outcome of `entry` at `price`. Success is checked first so it wins when
/// target and stop have crossed.
pub fn evaluate(entry: &TrackedPattern, price: f64) -> Outcome {
    if entry.pattern.signal.is_bullish() {
        if price >= entry.target_price {
            Outcome::Success
        } else if price <= entry.stop_loss {
            Outcome::Failure
        } else {
            Outcome::Pending
        }
    } else if price <= entry.target_price {
        Outcome::Success
    } else if price >= entry.stop_loss {
        Outcome::Failure
    } else {
        Outcome::Pending
    }
}

/// Pure reducer function
pub fn reduce(
    state: &mut TrackerState,
    event: Event,
    cfg: &TrackerConfig,
) -> Result<ReducerOutput, TrackerError> {
    // Reject before any mutation, including logical time
    match &event {
        Event::Intake { price, .. } | Event::Tick { price, .. } => {
            check_price(*price)?;
        }
        Event::Remove { id, .. } if state.get(id).is_none() => {
            return Ok(ReducerOutput {
                notices: Vec::new(),
                state_hash: state.hash(),
            });
        }
        Event::ClearResolved { .. } | Event::Remove { .. } => {}
    }

    let mut notices = Vec::new();

    // Logical time never goes backwards; entries are stamped with it
    state.now = state.now.max(event.timestamp());
    state.seq += 1;
    let now = state.now;

    match event {
        Event::Intake { price, patterns, .. } => {
            state.last_price = Some(price);
            handle_intake(state, now, price, patterns, cfg, &mut notices);
        }
        Event::Tick { price, .. } => {
            state.last_price = Some(price);
            handle_tick(state, now, price, &mut notices);
        }
        Event::ClearResolved { .. } => {
            let removed = state.remove_where(|e| e.result.is_resolved());
            notices.push(Notice::Cleared { removed });
        }
        Event::Remove { id, .. } => {
            state.remove_where(|e| e.id == id);
            notices.push(Notice::Removed { id });
        }
    }

    Ok(ReducerOutput {
        notices,
        state_hash: state.hash(),
    })
}

fn handle_intake(
    state: &mut TrackerState,
    now: Timestamp,
    price: f64,
    patterns: Vec<DetectedPattern>,
    cfg: &TrackerConfig,
    notices: &mut Vec<Notice>,
) {
    for pattern in patterns {
        if let Err(TrackerError::MalformedPattern { pattern_id, reason }) = pattern.check() {
            notices.push(Notice::Dropped { pattern_id, reason });
            continue;
        }
        if pattern.confidence < cfg.track_threshold() {
            continue;
        }
        // Covers repeats inside the same batch too, since entries are pushed as we go
        if state.is_tracked(&pattern.id) {
            continue;
        }

        let (target_price, stop_loss) = levels_for(&pattern, price, cfg);
        let entry = TrackedPattern {
            id: TrackedPattern::tracking_id(&pattern.id),
            pattern,
            entry_price: price,
            current_price: price,
            target_price,
            stop_loss,
            result: Outcome::Pending,
            pnl_percent: 0.0,
            tracked_at: now,
            resolved_at: None,
        };

        notices.push(Notice::Tracked {
            id: entry.id.clone(),
            pattern_id: entry.pattern.id.clone(),
            entry_price: entry.entry_price,
            target_price,
            stop_loss,
        });
        state.push(entry);
    }
}

fn handle_tick(state: &mut TrackerState, now: Timestamp, price: f64, notices: &mut Vec<Notice>) {
    for entry in state.entries.iter_mut().filter(|e| e.is_pending()) {
        entry.current_price = price;
        entry.pnl_percent = pnl_percent(entry.entry_price, price);

        let outcome = evaluate(entry, price);
        if outcome.is_resolved() {
            entry.result = outcome;
            entry.resolved_at = Some(now);
            notices.push(Notice::Resolved {
                id: entry.id.clone(),
                outcome,
                price,
                pnl_percent: entry.pnl_percent,
                resolved_at: now,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Signal;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn intake(state: &mut TrackerState, ts: Timestamp, price: f64, patterns: Vec<DetectedPattern>) -> ReducerOutput {
        reduce(state, Event::Intake { ts, price, patterns }, &TrackerConfig::default()).unwrap()
    }

    fn tick(state: &mut TrackerState, ts: Timestamp, price: f64) -> ReducerOutput {
        reduce(state, Event::Tick { ts, price }, &TrackerConfig::default()).unwrap()
    }

    #[test]
    fn test_bullish_levels() {
        let p = DetectedPattern::new("p1", "Double Bottom", Signal::Bullish, 0.8);
        let (target, stop) = levels_for(&p, 100.0, &TrackerConfig::default());
        assert!(approx(target, 104.40));
        assert!(approx(stop, 98.50));
    }

    #[test]
    fn test_bearish_levels() {
        let p = DetectedPattern::new("p2", "Head and Shoulders", Signal::Bearish, 0.9);
        let (target, stop) = levels_for(&p, 200.0, &TrackerConfig::default());
        assert!(approx(target, 190.60));
        assert!(approx(stop, 203.00));
    }

    #[test]
    fn test_neutral_uses_bearish_levels() {
        let p = DetectedPattern::new("p3", "Triangle", Signal::Neutral, 0.75);
        let (target, stop) = levels_for(&p, 100.0, &TrackerConfig::default());
        assert!(target < 100.0);
        assert!(approx(stop, 101.50));
    }

    #[test]
    fn test_intake_respects_threshold() {
        let mut state = TrackerState::new();
        let out = intake(
            &mut state,
            1,
            100.0,
            vec![
                DetectedPattern::new("low", "Flag", Signal::Bullish, 0.7499),
                DetectedPattern::new("edge", "Flag", Signal::Bullish, 0.75),
            ],
        );
        assert_eq!(state.len(), 1);
        assert!(state.is_tracked("edge"));
        assert!(!state.is_tracked("low"));
        assert_eq!(out.notices.len(), 1);
    }

    #[test]
    fn test_intake_dedups_within_batch_and_across_calls() {
        let mut state = TrackerState::new();
        let p = DetectedPattern::new("p1", "Flag", Signal::Bullish, 0.9);
        intake(&mut state, 1, 100.0, vec![p.clone(), p.clone()]);
        intake(&mut state, 2, 101.0, vec![p]);
        assert_eq!(state.len(), 1);
        assert!(approx(state.entries[0].entry_price, 100.0));
        assert_eq!(state.entries[0].tracked_at, 1);
    }

    #[test]
    fn test_malformed_pattern_dropped_batch_continues() {
        let mut state = TrackerState::new();
        let out = intake(
            &mut state,
            1,
            100.0,
            vec![
                DetectedPattern::new("", "Flag", Signal::Bullish, 0.9),
                DetectedPattern::new("ok", "Flag", Signal::Bullish, 0.9),
            ],
        );
        assert_eq!(state.len(), 1);
        assert!(matches!(out.notices[0], Notice::Dropped { .. }));
        assert!(matches!(out.notices[1], Notice::Tracked { .. }));
    }

    #[test]
    fn test_tick_resolves_success_and_freezes() {
        let mut state = TrackerState::new();
        intake(&mut state, 1, 100.0, vec![DetectedPattern::new("p1", "Flag", Signal::Bullish, 0.8)]);

        let out = tick(&mut state, 2, 102.0);
        assert!(out.notices.is_empty());
        assert!(approx(state.entries[0].pnl_percent, 2.0));

        tick(&mut state, 3, 105.0);
        let e = &state.entries[0];
        assert_eq!(e.result, Outcome::Success);
        assert_eq!(e.resolved_at, Some(3));
        assert!(approx(e.pnl_percent, 5.0));

        tick(&mut state, 4, 90.0);
        let e = &state.entries[0];
        assert_eq!(e.result, Outcome::Success);
        assert_eq!(e.resolved_at, Some(3));
        assert!(approx(e.current_price, 105.0));
        assert!(approx(e.pnl_percent, 5.0));
    }

    #[test]
    fn test_bearish_failure_on_stop() {
        let mut state = TrackerState::new();
        intake(&mut state, 1, 200.0, vec![DetectedPattern::new("p2", "Wedge", Signal::Bearish, 0.9)]);
        tick(&mut state, 2, 203.5);
        let e = &state.entries[0];
        assert_eq!(e.result, Outcome::Failure);
        assert!(approx(e.pnl_percent, 1.75));
    }

    #[test]
    fn test_success_wins_when_levels_cross() {
        let mut entry = TrackedPattern {
            id: "track-x".into(),
            pattern: DetectedPattern::new("x", "Flag", Signal::Bullish, 0.9),
            entry_price: 100.0,
            current_price: 100.0,
            target_price: 99.0,
            stop_loss: 101.0,
            result: Outcome::Pending,
            pnl_percent: 0.0,
            tracked_at: 0,
            resolved_at: None,
        };
        assert_eq!(evaluate(&entry, 100.0), Outcome::Success);

        entry.pattern.signal = Signal::Bearish;
        entry.target_price = 101.0;
        entry.stop_loss = 99.0;
        assert_eq!(evaluate(&entry, 100.0), Outcome::Success);
    }

    #[test]
    fn test_invalid_tick_rejected_without_mutation() {
        let mut state = TrackerState::new();
        intake(&mut state, 1, 100.0, vec![DetectedPattern::new("p1", "Flag", Signal::Bullish, 0.8)]);
        let before = state.hash();

        let err = reduce(&mut state, Event::Tick { ts: 9, price: f64::NAN }, &TrackerConfig::default());
        assert!(matches!(err, Err(TrackerError::InvalidPriceTick { .. })));
        let err = reduce(&mut state, Event::Tick { ts: 9, price: -1.0 }, &TrackerConfig::default());
        assert!(err.is_err());
        assert_eq!(state.hash(), before);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut state = TrackerState::new();
        intake(&mut state, 1, 100.0, vec![DetectedPattern::new("p1", "Flag", Signal::Bullish, 0.8)]);
        let seq = state.seq;
        let before = state.hash();
        let out = reduce(
            &mut state,
            Event::Remove { ts: 2, id: "track-nope".into() },
            &TrackerConfig::default(),
        )
        .unwrap();
        assert!(out.notices.is_empty());
        assert_eq!(out.state_hash, before);
        assert_eq!(state.seq, seq);
        assert_eq!(state.now, 1);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_out_of_order_tick_never_resolves_before_tracking() {
        let mut state = TrackerState::new();
        intake(&mut state, 5_000, 100.0, vec![DetectedPattern::new("p1", "Flag", Signal::Bullish, 0.8)]);
        let out = tick(&mut state, 1_000, 105.0);

        let e = &state.entries[0];
        assert_eq!(e.result, Outcome::Success);
        assert_eq!(e.tracked_at, 5_000);
        assert_eq!(e.resolved_at, Some(5_000));
        assert!(e.resolved_at.unwrap() >= e.tracked_at);
        assert!(matches!(out.notices[0], Notice::Resolved { resolved_at: 5_000, .. }));
        assert_eq!(state.now, 5_000);
    }

    #[test]
    fn test_late_intake_uses_logical_time() {
        let mut state = TrackerState::new();
        tick(&mut state, 9_000, 100.0);
        intake(&mut state, 3_000, 100.0, vec![DetectedPattern::new("p1", "Flag", Signal::Bullish, 0.8)]);
        assert_eq!(state.entries[0].tracked_at, 9_000);
    }

    #[test]
    fn test_neutral_fails_at_stop() {
        let mut state = TrackerState::new();
        intake(&mut state, 1, 100.0, vec![DetectedPattern::new("n1", "Rectangle", Signal::Neutral, 0.8)]);
        let e = &state.entries[0];
        assert!(approx(e.target_price, 95.60));
        assert!(approx(e.stop_loss, 101.50));

        tick(&mut state, 2, 101.0);
        assert_eq!(state.entries[0].result, Outcome::Pending);

        tick(&mut state, 3, 101.5);
        let e = &state.entries[0];
        assert_eq!(e.result, Outcome::Failure);
        assert!(approx(e.pnl_percent, 1.5));
    }

    #[test]
    fn test_neutral_succeeds_at_or_below_target() {
        for price in [95.6, 94.0] {
            let mut state = TrackerState::new();
            intake(&mut state, 1, 100.0, vec![DetectedPattern::new("n1", "Rectangle", Signal::Neutral, 0.8)]);
            tick(&mut state, 2, price);
            let e = &state.entries[0];
            assert_eq!(e.result, Outcome::Success, "price {}", price);
            assert_eq!(e.resolved_at, Some(2));
        }
    }

    #[test]
    fn test_threshold_floor_survives_lower_config() {
        let cfg = TrackerConfig {
            min_confidence: 0.5,
            ..TrackerConfig::default()
        };
        let mut state = TrackerState::new();
        reduce(
            &mut state,
            Event::Intake {
                ts: 1,
                price: 100.0,
                patterns: vec![
                    DetectedPattern::new("low", "Flag", Signal::Bullish, 0.6),
                    DetectedPattern::new("ok", "Flag", Signal::Bullish, 0.75),
                ],
            },
            &cfg,
        )
        .unwrap();
        assert!(!state.is_tracked("low"));
        assert!(state.is_tracked("ok"));
    }

    #[test]
    fn test_removed_pattern_can_be_tracked_again() {
        let mut state = TrackerState::new();
        let p = DetectedPattern::new("p1", "Flag", Signal::Bullish, 0.8);
        intake(&mut state, 1, 100.0, vec![p.clone()]);
        reduce(&mut state, Event::Remove { ts: 2, id: "track-p1".into() }, &TrackerConfig::default()).unwrap();
        assert!(state.is_empty());
        intake(&mut state, 3, 110.0, vec![p]);
        assert_eq!(state.len(), 1);
        assert!(approx(state.entries[0].entry_price, 110.0));
    }

    #[test]
    fn test_replay_is_deterministic() {
        let events = vec![
            Event::Intake {
                ts: 1,
                price: 100.0,
                patterns: vec![
                    DetectedPattern::new("a", "Flag", Signal::Bullish, 0.8),
                    DetectedPattern::new("b", "Wedge", Signal::Bearish, 0.95),
                ],
            },
            Event::Tick { ts: 2, price: 96.0 },
            Event::Tick { ts: 3, price: 105.0 },
            Event::ClearResolved { ts: 4 },
        ];

        let run = || {
            let mut state = TrackerState::new();
            let mut last = 0;
            for e in events.clone() {
                last = reduce(&mut state, e, &TrackerConfig::default()).unwrap().state_hash;
            }
            last
        };
        assert_eq!(run(), run());
    }
}
