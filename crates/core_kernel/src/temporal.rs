//! Billing time handling
//!
//! This module provides the time types used by the accrual engine:
//! - `BillingPeriod`: the fixed duration after which one fee becomes due
//! - `BillingWindow`: the half-open interval `[start, end)` already paid for
//! - `Clock`: the injected source of "now"

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default billing period: 30 days
pub const DEFAULT_BILLING_PERIOD_SECS: u64 = 30 * 24 * 60 * 60;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid billing period: {0}s")]
    InvalidPeriod(u64),

    #[error("Timestamp out of range: {start} + {periods} periods")]
    OutOfRange {
        start: String,
        periods: u64,
    },
}

/// Fixed billing period length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillingPeriod {
    secs: u64,
}

impl BillingPeriod {
    pub fn from_secs(secs: u64) -> Result<Self, TemporalError> {
        if secs == 0 || secs > (i64::MAX / 1_000) as u64 {
            return Err(TemporalError::InvalidPeriod(secs));
        }
        Ok(Self { secs })
    }

    pub fn as_secs(&self) -> u64 {
        self.secs
    }

    /// Number of periods needed to cover the span from `from` to `to`, rounded up
    ///
    /// Returns 0 when `to` is not after `from`. Any sub-second remainder
    /// counts toward a further period.
    pub fn periods_between_ceil(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
        let elapsed = to - from;
        if elapsed <= Duration::zero() {
            return 0;
        }
        let whole_secs = elapsed.num_seconds() as u64;
        let has_fraction = elapsed.subsec_nanos() != 0;
        let periods = whole_secs / self.secs;
        if whole_secs % self.secs != 0 || has_fraction {
            periods.saturating_add(1)
        } else {
            periods
        }
    }

    /// Returns `start + periods * self`
    pub fn advance(&self, start: DateTime<Utc>, periods: u64) -> Result<DateTime<Utc>, TemporalError> {
        let out_of_range = || TemporalError::OutOfRange {
            start: start.to_rfc3339(),
            periods,
        };
        let secs = periods
            .checked_mul(self.secs)
            .and_then(|s| i64::try_from(s).ok())
            .ok_or_else(out_of_range)?;
        let span = Duration::try_seconds(secs).ok_or_else(out_of_range)?;
        start.checked_add_signed(span).ok_or_else(out_of_range)
    }
}

impl Default for BillingPeriod {
    fn default() -> Self {
        Self {
            secs: DEFAULT_BILLING_PERIOD_SECS,
        }
    }
}

/// The paid-for interval of a subscription
///
/// `end` is always exactly one billing period after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BillingWindow {
    /// Opens a window of one period starting at `start`
    pub fn starting_at(start: DateTime<Utc>, period: BillingPeriod) -> Result<Self, TemporalError> {
        Ok(Self {
            start,
            end: period.advance(start, 1)?,
        })
    }

    /// Returns true once the window has closed at `now`
    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.end
    }

    /// Moves the window forward by `periods` whole periods
    pub fn advanced_by(&self, periods: u64, period: BillingPeriod) -> Result<Self, TemporalError> {
        let start = period.advance(self.start, periods)?;
        Self::starting_at(start, period)
    }
}

/// Source of the current time
///
/// The host environment decides what "now" is for a call; the engine never
/// reads the wall clock directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_invalid_period() {
        assert_eq!(BillingPeriod::from_secs(0), Err(TemporalError::InvalidPeriod(0)));
    }

    #[test]
    fn test_periods_between_ceil() {
        let period = BillingPeriod::default();
        let day = Duration::days(1);

        assert_eq!(period.periods_between_ceil(t0(), t0()), 0);
        assert_eq!(period.periods_between_ceil(t0(), t0() - day), 0);
        assert_eq!(period.periods_between_ceil(t0(), t0() + day), 1);
        assert_eq!(period.periods_between_ceil(t0(), t0() + Duration::days(30)), 1);
        assert_eq!(period.periods_between_ceil(t0(), t0() + Duration::days(31)), 2);
    }

    #[test]
    fn test_periods_between_ceil_counts_sub_second_remainder() {
        let period = BillingPeriod::default();
        let half_second = Duration::milliseconds(500);

        assert_eq!(period.periods_between_ceil(t0(), t0() + half_second), 1);
        assert_eq!(period.periods_between_ceil(t0(), t0() + Duration::days(30) + half_second), 2);
        assert_eq!(period.periods_between_ceil(t0(), t0() + Duration::days(60) + Duration::nanoseconds(1)), 3);
        assert_eq!(period.periods_between_ceil(t0(), t0() - half_second), 0);
    }

    #[test]
    fn test_window_advance() {
        let period = BillingPeriod::default();
        let window = BillingWindow::starting_at(t0(), period).unwrap();
        assert_eq!(window.end, t0() + Duration::days(30));

        let advanced = window.advanced_by(2, period).unwrap();
        assert_eq!(advanced.start, t0() + Duration::days(60));
        assert_eq!(advanced.end, t0() + Duration::days(90));
        assert!(!advanced.has_elapsed(t0() + Duration::days(89)));
        assert!(advanced.has_elapsed(t0() + Duration::days(90)));
    }

    #[test]
    fn test_advance_out_of_range() {
        let period = BillingPeriod::default();
        assert!(matches!(
            period.advance(t0(), u64::MAX),
            Err(TemporalError::OutOfRange { .. })
        ));
    }
}
