//! Accuracy tracking for detected chart patterns.
//!
//! Patterns above a confidence threshold are tracked from the price at which
//! they were seen, resolved as success or failure when price crosses their
//! target or stop, and summarised into win-rate and P&L statistics.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod logging;
pub mod pattern;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use engine::{Notice, Outcome, PatternStore, TrackedPattern, TrackerHandle};
pub use error::TrackerError;
pub use pattern::{DetectedPattern, Signal};
pub use stats::AccuracyStats;
