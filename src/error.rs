use std::fmt;

/// Failures surfaced by the tracker.
///
/// Duplicate pattern ids are deduplicated on intake and never reach here.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerError {
    /// Price is non-finite or not strictly positive. The whole tick is rejected.
    InvalidPriceTick { price: f64 },
    /// Pattern is missing a required field or carries an out-of-range value.
    MalformedPattern { pattern_id: String, reason: String },
    /// The actor task owning the store has stopped.
    StoreClosed,
}

impl TrackerError {
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::InvalidPriceTick { .. } => "invalid_price_tick",
            TrackerError::MalformedPattern { .. } => "malformed_pattern",
            TrackerError::StoreClosed => "store_closed",
        }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::InvalidPriceTick { price } => write!(f, "invalid price tick: {}", price),
            TrackerError::MalformedPattern { pattern_id, reason } => {
                write!(f, "malformed pattern '{}': {}", pattern_id, reason)
            }
            TrackerError::StoreClosed => write!(f, "tracker store is closed"),
        }
    }
}

impl std::error::Error for TrackerError {}

/// Rejects prices the resolution math cannot use.
pub fn check_price(price: f64) -> Result<f64, TrackerError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(TrackerError::InvalidPriceTick { price })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_price() {
        assert_eq!(check_price(101.5), Ok(101.5));
        assert!(check_price(0.0).is_err());
        assert!(check_price(-3.0).is_err());
        assert!(check_price(f64::NAN).is_err());
        assert!(check_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_display_and_code() {
        let err = TrackerError::MalformedPattern {
            pattern_id: "p1".into(),
            reason: "missing type".into(),
        };
        assert_eq!(err.code(), "malformed_pattern");
        assert_eq!(err.to_string(), "malformed pattern 'p1': missing type");
    }
}
