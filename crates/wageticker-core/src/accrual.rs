//! Earnings accrual.
//!
//! Earnings grow linearly at a fixed per-second rate. A checkpoint records
//! the exact total at one instant, so the total at any later instant is the
//! checkpoint plus the rate times the elapsed wall-clock time. Resuming from
//! a checkpoint therefore gives the same answer as accruing continuously from
//! the start date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 7 days * 24 hours * 60 minutes * 60 seconds.
pub const SECONDS_PER_WEEK: f64 = 604_800.0;

/// Earnings were exactly `accumulated` at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarningsCheckpoint {
    pub accumulated: f64,
    pub timestamp: DateTime<Utc>,
}

impl EarningsCheckpoint {
    pub fn new(accumulated: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            accumulated,
            timestamp,
        }
    }

    /// Total at `now` given the rate in effect since the checkpoint.
    pub fn project(&self, second_rate: f64, now: DateTime<Utc>) -> f64 {
        self.accumulated + second_rate * elapsed_secs(self.timestamp, now)
    }
}

/// Weekly net earnings spread evenly over every second of the week.
pub fn earnings_per_second(net_hourly_wage: f64, hours_per_week: f64) -> f64 {
    let weekly_earnings = net_hourly_wage * hours_per_week;
    weekly_earnings / SECONDS_PER_WEEK
}

/// Accumulated earnings at `now`.
///
/// Resumes from the checkpoint when one with a positive total exists,
/// otherwise accrues from `start_date`. Without a start date nothing has
/// accrued yet.
pub fn accumulated_earnings(
    start_date: Option<DateTime<Utc>>,
    second_rate: f64,
    last_saved_earnings: f64,
    last_saved_timestamp: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    if let Some(timestamp) = last_saved_timestamp.filter(|_| last_saved_earnings > 0.0) {
        return EarningsCheckpoint::new(last_saved_earnings, timestamp).project(second_rate, now);
    }
    match start_date {
        Some(start) => second_rate * elapsed_secs(start, now),
        None => 0.0,
    }
}

/// Seconds from `from` to `to`, clamped at zero if the clock went backwards.
pub fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from)
        .to_std()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    #[test]
    fn per_second_rate_for_full_time_week() {
        let rate = earnings_per_second(16.179_172_985_781_99, 40.0);
        assert!((rate - 0.001_070_051_123_398_279_7).abs() < 1e-15);
    }

    #[test]
    fn accrues_from_start_without_checkpoint() {
        let now = t0() + Duration::hours(1);
        let total = accumulated_earnings(Some(t0()), 0.5, 0.0, None, now);
        assert!((total - 1800.0).abs() < 1e-9);
    }

    #[test]
    fn resumes_from_checkpoint() {
        let saved_at = t0() + Duration::seconds(100);
        let now = saved_at + Duration::seconds(20);
        let total = accumulated_earnings(Some(t0()), 0.5, 50.0, Some(saved_at), now);
        assert!((total - 60.0).abs() < 1e-9);
    }

    #[test]
    fn zero_checkpoint_falls_back_to_start_date() {
        let now = t0() + Duration::seconds(10);
        let saved_at = Some(t0() + Duration::seconds(5));
        let total = accumulated_earnings(Some(t0()), 1.0, 0.0, saved_at, now);
        assert!((total - 10.0).abs() < 1e-9);
    }

    #[test]
    fn checkpoint_without_timestamp_falls_back_to_start_date() {
        let now = t0() + Duration::seconds(10);
        let total = accumulated_earnings(Some(t0()), 1.0, 99.0, None, now);
        assert!((total - 10.0).abs() < 1e-9);
    }

    #[test]
    fn no_start_date_means_nothing_accrued() {
        assert_eq!(accumulated_earnings(None, 1.0, 0.0, None, t0()), 0.0);
    }

    #[test]
    fn backwards_clock_does_not_reduce_total() {
        let saved_at = t0();
        let earlier = t0() - Duration::seconds(30);
        let total = accumulated_earnings(Some(t0()), 1.0, 12.0, Some(saved_at), earlier);
        assert_eq!(total, 12.0);
    }

    #[test]
    fn sub_second_elapsed_is_fractional() {
        let now = t0() + Duration::milliseconds(250);
        assert!((elapsed_secs(t0(), now) - 0.25).abs() < 1e-12);
    }
}
