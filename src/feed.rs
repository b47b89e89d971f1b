//! Input sources: JSONL replay files and a seeded simulator standing in for
//! the price feed and pattern detector.
//!
//! Wire format, one object per line (`#` comments and blank lines skipped):
//! ```text
//! {"type":"patterns","price":100.0,"ts":1,"patterns":[{"id":"p1","type":"Double Bottom","signal":"Bullish","confidence":0.8}]}
//! {"type":"price","price":105.0,"ts":2}
//! {"type":"clear_resolved","ts":3}
//! {"type":"remove","id":"track-p1","ts":4}
//! ```

use std::io::BufRead;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;

use crate::engine::events::{Event, Timestamp};
use crate::engine::reducer::round2;
use crate::error::TrackerError;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::pattern::{DetectedPattern, RawPattern, Signal};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireRecord {
    Patterns {
        price: f64,
        #[serde(default)]
        patterns: Vec<RawPattern>,
        ts: Option<Timestamp>,
    },
    Price {
        price: f64,
        ts: Option<Timestamp>,
    },
    ClearResolved {
        ts: Option<Timestamp>,
    },
    Remove {
        id: String,
        ts: Option<Timestamp>,
    },
}

/// One validated feed line.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedRecord {
    Patterns {
        price: f64,
        patterns: Vec<DetectedPattern>,
        ts: Option<Timestamp>,
    },
    Price {
        price: f64,
        ts: Option<Timestamp>,
    },
    ClearResolved {
        ts: Option<Timestamp>,
    },
    Remove {
        id: String,
        ts: Option<Timestamp>,
    },
}

impl FeedRecord {
    pub fn ts(&self) -> Option<Timestamp> {
        match self {
            FeedRecord::Patterns { ts, .. }
            | FeedRecord::Price { ts, .. }
            | FeedRecord::ClearResolved { ts }
            | FeedRecord::Remove { ts, .. } => *ts,
        }
    }

    /// Engine events, stamped with the record's own `ts` when it has one.
    ///
    /// A pattern batch arrives with a fresh price, so it first resolves
    /// pending entries at that price and then takes in the new patterns.
    pub fn into_events(self, fallback_ts: Timestamp) -> Vec<Event> {
        let ts = self.ts().unwrap_or(fallback_ts);
        match self {
            FeedRecord::Patterns { price, patterns, .. } => vec![
                Event::Tick { ts, price },
                Event::Intake { ts, price, patterns },
            ],
            FeedRecord::Price { price, .. } => vec![Event::Tick { ts, price }],
            FeedRecord::ClearResolved { .. } => vec![Event::ClearResolved { ts }],
            FeedRecord::Remove { id, .. } => vec![Event::Remove { ts, id }],
        }
    }
}

/// Parsed line plus the patterns that had to be dropped from it.
#[derive(Debug)]
pub struct ParsedLine {
    pub record: FeedRecord,
    pub dropped: Vec<TrackerError>,
}

/// `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<ParsedLine>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let wire: WireRecord =
        serde_json::from_str(trimmed).map_err(|e| anyhow!("bad feed record: {}", e))?;

    let mut dropped = Vec::new();
    let record = match wire {
        WireRecord::Patterns { price, patterns, ts } => {
            let mut valid = Vec::with_capacity(patterns.len());
            for raw in patterns {
                match raw.validate() {
                    Ok(p) => valid.push(p),
                    Err(err) => dropped.push(err),
                }
            }
            FeedRecord::Patterns { price, patterns: valid, ts }
        }
        WireRecord::Price { price, ts } => FeedRecord::Price { price, ts },
        WireRecord::ClearResolved { ts } => FeedRecord::ClearResolved { ts },
        WireRecord::Remove { id, ts } => FeedRecord::Remove { id, ts },
    };
    Ok(Some(ParsedLine { record, dropped }))
}

#[async_trait]
pub trait FeedSource: Send {
    fn name(&self) -> &str;

    /// `None` once the source is exhausted.
    async fn next_record(&mut self) -> Option<FeedRecord>;
}

/// Reads [`FeedRecord`]s from any line source. Bad lines are logged and skipped.
pub struct JsonlFeed<R> {
    name: String,
    lines: std::io::Lines<R>,
    line_no: usize,
    skipped: usize,
}

impl<R: BufRead> JsonlFeed<R> {
    pub fn new(name: &str, reader: R) -> Self {
        Self {
            name: name.to_string(),
            lines: reader.lines(),
            line_no: 0,
            skipped: 0,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Synchronous variant used by the replay binary.
    pub fn next_blocking(&mut self) -> Option<FeedRecord> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    self.report_skip(&format!("read error: {}", err));
                    return None;
                }
            };
            self.line_no += 1;
            match parse_line(&line) {
                Ok(None) => continue,
                Ok(Some(parsed)) => {
                    for err in &parsed.dropped {
                        if let TrackerError::MalformedPattern { pattern_id, reason } = err {
                            crate::logging::log_dropped(pattern_id, reason);
                        }
                    }
                    return Some(parsed.record);
                }
                Err(err) => self.report_skip(&err.to_string()),
            }
        }
    }

    fn report_skip(&mut self, reason: &str) {
        self.skipped += 1;
        log(
            Level::Warn,
            Domain::Feed,
            "line_skipped",
            obj(&[
                ("source", v_str(&self.name)),
                ("line", serde_json::json!(self.line_no)),
                ("msg", v_str(reason)),
            ]),
        );
    }
}

#[async_trait]
impl<R: BufRead + Send> FeedSource for JsonlFeed<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_record(&mut self) -> Option<FeedRecord> {
        self.next_blocking()
    }
}

/// Pattern names and the bias the simulated detector gives them.
const SIM_PATTERNS: &[(&str, Signal)] = &[
    ("Double Bottom", Signal::Bullish),
    ("Inverse Head and Shoulders", Signal::Bullish),
    ("Bull Flag", Signal::Bullish),
    ("Falling Wedge", Signal::Bullish),
    ("Double Top", Signal::Bearish),
    ("Head and Shoulders", Signal::Bearish),
    ("Bear Flag", Signal::Bearish),
    ("Rising Wedge", Signal::Bearish),
    ("Symmetrical Triangle", Signal::Neutral),
    ("Rectangle", Signal::Neutral),
];

/// Seeded random-walk price with occasional pattern batches.
pub struct SimulatedFeed {
    rng: StdRng,
    price: f64,
    remaining: u64,
    emitted: u64,
    next_pattern: u64,
    /// Probability that a record is a pattern batch instead of a plain tick
    pub pattern_prob: f64,
    /// Max absolute fractional move per tick
    pub step_pct: f64,
}

impl SimulatedFeed {
    pub fn new(seed: u64, start_price: f64, records: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            price: start_price,
            remaining: records,
            emitted: 0,
            next_pattern: 0,
            pattern_prob: 0.15,
            step_pct: 0.006,
        }
    }

    pub fn next_sync(&mut self) -> Option<FeedRecord> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.emitted += 1;

        let step = self.rng.gen_range(-self.step_pct..=self.step_pct);
        self.price = round2((self.price * (1.0 + step)).max(0.01));

        if self.rng.gen_bool(self.pattern_prob.clamp(0.0, 1.0)) {
            let count = self.rng.gen_range(1..=3);
            let patterns = (0..count).map(|_| self.random_pattern()).collect();
            Some(FeedRecord::Patterns {
                price: self.price,
                patterns,
                ts: None,
            })
        } else {
            Some(FeedRecord::Price {
                price: self.price,
                ts: None,
            })
        }
    }

    fn random_pattern(&mut self) -> DetectedPattern {
        let (name, signal) = SIM_PATTERNS[self.rng.gen_range(0..SIM_PATTERNS.len())];
        self.next_pattern += 1;
        DetectedPattern {
            id: format!("sim-{}-{}", self.emitted, self.next_pattern),
            pattern_type: name.to_string(),
            signal,
            confidence: round2(self.rng.gen_range(0.6..=1.0)),
        }
    }
}

#[async_trait]
impl FeedSource for SimulatedFeed {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn next_record(&mut self) -> Option<FeedRecord> {
        self.next_sync()
    }
}
