use std::time::Duration;

/// Ticks between stats snapshots in the live loop.
const STATS_EVERY_TICKS: u64 = 50;

/// Upper bound on any timer period; keeps deadline arithmetic in range.
const MAX_INTERVAL_MS: u64 = 86_400_000;

/// Lowest confidence that can ever be tracked. Confidence bands start here.
pub const MIN_TRACK_CONFIDENCE: f64 = 0.75;

/// Tracking thresholds and level multipliers.
///
/// Target multiplier: `1 ± (target_base_pct + confidence * target_confidence_pct)`.
/// Stop multiplier: `1 ∓ stop_pct`, independent of confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Display label only.
    pub instrument: String,
    /// Patterns below this confidence are never tracked. Values under
    /// [`MIN_TRACK_CONFIDENCE`] are ignored.
    pub min_confidence: f64,
    pub target_base_pct: f64,
    pub target_confidence_pct: f64,
    pub stop_pct: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            instrument: "BTCUSDT".to_string(),
            min_confidence: MIN_TRACK_CONFIDENCE,
            target_base_pct: 0.02,
            target_confidence_pct: 0.03,
            stop_pct: 0.015,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            instrument: std::env::var("INSTRUMENT").unwrap_or(d.instrument),
            min_confidence: std::env::var("MIN_CONFIDENCE")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .map_or(d.min_confidence, |v| v.max(MIN_TRACK_CONFIDENCE)),
            target_base_pct: std::env::var("TARGET_BASE_PCT").ok().and_then(|v| v.parse().ok()).unwrap_or(d.target_base_pct),
            target_confidence_pct: std::env::var("TARGET_CONF_PCT").ok().and_then(|v| v.parse().ok()).unwrap_or(d.target_confidence_pct),
            stop_pct: std::env::var("STOP_PCT").ok().and_then(|v| v.parse().ok()).unwrap_or(d.stop_pct),
        }
    }

    /// Effective intake threshold, never below [`MIN_TRACK_CONFIDENCE`].
    pub fn track_threshold(&self) -> f64 {
        self.min_confidence.max(MIN_TRACK_CONFIDENCE)
    }
}

/// Knobs for the live simulation binary.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub seed: u64,
    pub ticks: u64,
    pub start_price: f64,
    pub tick_ms: u64,
    pub channel_capacity: usize,
}

impl SimConfig {
    pub fn from_env() -> Self {
        Self {
            seed: std::env::var("SEED").ok().and_then(|v| v.parse().ok()).unwrap_or(42),
            ticks: std::env::var("SIM_TICKS").ok().and_then(|v| v.parse().ok()).unwrap_or(500),
            start_price: std::env::var("START_PRICE").ok().and_then(|v| v.parse().ok()).unwrap_or(100.0),
            tick_ms: std::env::var("TICK_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
            channel_capacity: std::env::var("CHANNEL_CAP").ok().and_then(|v| v.parse().ok()).unwrap_or(256),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.clamp(1, MAX_INTERVAL_MS))
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(
            self.tick_ms
                .max(1)
                .saturating_mul(STATS_EVERY_TICKS)
                .min(MAX_INTERVAL_MS),
        )
    }
}
