use chrono::{DateTime, Utc};
use serde::Serialize;

/// Staleness verdict for a stored occupancy observation.
#[derive(Debug, Clone, Serialize)]
pub struct Freshness {
    /// Minutes between the observation and the query instant (may be
    /// fractional or negative for observations nominally in the future).
    pub elapsed_minutes: f64,
    /// True when the observation is within the caller's threshold.
    pub is_fresh: bool,
    /// Present only when stale; embeds the elapsed minutes and the threshold.
    pub warning: Option<String>,
}

/// Evaluate how fresh an observation is relative to a query instant.
///
/// Pure function: no clock access, no special-casing of negative elapsed
/// values. The threshold is caller-supplied; the read API passes the
/// configured operational default.
pub fn evaluate(
    observed_at: DateTime<Utc>,
    as_of: DateTime<Utc>,
    max_age_minutes: i64,
) -> Freshness {
    let elapsed_minutes =
        as_of.signed_duration_since(observed_at).num_milliseconds() as f64 / 60_000.0;
    let is_fresh = elapsed_minutes <= max_age_minutes as f64;
    let warning = if is_fresh {
        None
    } else {
        Some(format!(
            "Data is stale by {:.1} minutes (max {})",
            elapsed_minutes, max_age_minutes
        ))
    };

    Freshness {
        elapsed_minutes,
        is_fresh,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn within_threshold_is_fresh() {
        let result = evaluate(t0(), t0() + Duration::minutes(4), 5);
        assert!(result.is_fresh);
        assert_eq!(result.elapsed_minutes, 4.0);
        assert!(result.warning.is_none());
    }

    #[test]
    fn beyond_threshold_is_stale_with_warning() {
        let result = evaluate(t0(), t0() + Duration::minutes(6), 5);
        assert!(!result.is_fresh);
        assert_eq!(result.elapsed_minutes, 6.0);
        let warning = result.warning.unwrap();
        assert!(warning.contains("6.0"));
        assert!(warning.contains("5"));
    }

    #[test]
    fn exactly_at_threshold_is_fresh() {
        let result = evaluate(t0(), t0() + Duration::minutes(5), 5);
        assert!(result.is_fresh);
    }

    #[test]
    fn elapsed_minutes_are_fractional() {
        let result = evaluate(t0(), t0() + Duration::seconds(90), 5);
        assert_eq!(result.elapsed_minutes, 1.5);
        assert!(result.is_fresh);
    }

    #[test]
    fn future_observation_is_not_an_error() {
        let result = evaluate(t0() + Duration::minutes(3), t0(), 5);
        assert_eq!(result.elapsed_minutes, -3.0);
        assert!(result.is_fresh);
        assert!(result.warning.is_none());
    }
}
