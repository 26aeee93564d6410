//! Shared test helpers (§10.6): time arithmetic and float-tolerance comparison used across
//! the workspace's unit tests. Kept out of `#[cfg(test)]` so downstream crates can depend on
//! it as a dev-dependency without duplicating these helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// Compares two `f64`s for approximate equality within `1e-8`, since direct float
/// equality is brittle across the fixed-point/float boundary in fill pricing.
pub fn f64_is_eq(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-8
}

pub fn time_plus_days(base: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    base + TimeDelta::days(days)
}

pub fn time_plus_secs(base: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    base + TimeDelta::seconds(secs)
}

pub fn time_plus_millis(base: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
    base + TimeDelta::milliseconds(millis)
}

pub fn time_plus_micros(base: DateTime<Utc>, micros: i64) -> DateTime<Utc> {
    base + TimeDelta::microseconds(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_is_eq_tolerates_epsilon_noise() {
        assert!(f64_is_eq(1.000_000_001, 1.0));
        assert!(!f64_is_eq(1.01, 1.0));
    }

    #[test]
    fn time_arithmetic_is_additive() {
        let base = DateTime::<Utc>::UNIX_EPOCH;
        assert_eq!(time_plus_days(base, 1), time_plus_secs(base, 86_400));
        assert_eq!(time_plus_secs(base, 1), time_plus_millis(base, 1_000));
        assert_eq!(time_plus_millis(base, 1), time_plus_micros(base, 1_000));
    }
}
