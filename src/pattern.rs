//! Detected chart patterns as they arrive from the recognition collaborator.

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Directional bias of a detected pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    Bullish,
    Bearish,
    Neutral,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Bullish, Signal::Bearish, Signal::Neutral];

    /// Neutral patterns resolve like bearish ones.
    pub fn is_bullish(&self) -> bool {
        matches!(self, Signal::Bullish)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Some(Signal::Bullish),
            "bearish" => Some(Signal::Bearish),
            "neutral" => Some(Signal::Neutral),
            _ => None,
        }
    }
}

/// A pattern reported by the detector. Well-formed by construction when
/// built through [`RawPattern::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    pub id: String,
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub signal: Signal,
    pub confidence: f64,
}

impl DetectedPattern {
    pub fn new(id: &str, pattern_type: &str, signal: Signal, confidence: f64) -> Self {
        Self {
            id: id.to_string(),
            pattern_type: pattern_type.to_string(),
            signal,
            confidence,
        }
    }

    pub fn check(&self) -> Result<(), TrackerError> {
        let malformed = |reason: &str| TrackerError::MalformedPattern {
            pattern_id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(malformed("empty id"));
        }
        if self.pattern_type.trim().is_empty() {
            return Err(malformed("empty type"));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(malformed("confidence outside [0, 1]"));
        }
        Ok(())
    }
}

/// Pattern as it appears on the wire, every field optional so a single bad
/// entry can be dropped without losing the rest of its batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPattern {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub pattern_type: Option<String>,
    pub signal: Option<String>,
    pub confidence: Option<f64>,
}

impl RawPattern {
    pub fn validate(self) -> Result<DetectedPattern, TrackerError> {
        let pattern_id = self.id.clone().unwrap_or_default();
        let malformed = |reason: &str| TrackerError::MalformedPattern {
            pattern_id: pattern_id.clone(),
            reason: reason.to_string(),
        };

        let id = self.id.ok_or_else(|| malformed("missing id"))?;
        let pattern_type = self.pattern_type.ok_or_else(|| malformed("missing type"))?;
        let signal_raw = self.signal.ok_or_else(|| malformed("missing signal"))?;
        let signal = Signal::parse(&signal_raw)
            .ok_or_else(|| malformed(&format!("unknown signal '{}'", signal_raw)))?;
        let confidence = self.confidence.ok_or_else(|| malformed("missing confidence"))?;

        let pattern = DetectedPattern {
            id,
            pattern_type,
            signal,
            confidence,
        };
        pattern.check()?;
        Ok(pattern)
    }
}
