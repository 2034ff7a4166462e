//! Tests for billing periods and windows

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::temporal::DEFAULT_BILLING_PERIOD_SECS;
use core_kernel::{BillingPeriod, BillingWindow, Clock, SystemClock, TemporalError};

fn jan_1() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

mod billing_period {
    use super::*;

    #[test]
    fn test_default_is_thirty_days() {
        assert_eq!(BillingPeriod::default().as_secs(), DEFAULT_BILLING_PERIOD_SECS);
        assert_eq!(DEFAULT_BILLING_PERIOD_SECS, 2_592_000);
    }

    #[test]
    fn test_rejects_zero() {
        assert_eq!(BillingPeriod::from_secs(0), Err(TemporalError::InvalidPeriod(0)));
    }

    #[test]
    fn test_rejects_unrepresentable_length() {
        assert!(BillingPeriod::from_secs(u64::MAX).is_err());
    }

    #[test]
    fn test_ceil_counts_partial_periods() {
        let period = BillingPeriod::from_secs(100).unwrap();
        let start = jan_1();

        assert_eq!(period.periods_between_ceil(start, start + Duration::seconds(1)), 1);
        assert_eq!(period.periods_between_ceil(start, start + Duration::seconds(100)), 1);
        assert_eq!(period.periods_between_ceil(start, start + Duration::seconds(101)), 2);
        assert_eq!(period.periods_between_ceil(start, start + Duration::seconds(250)), 3);
    }

    #[test]
    fn test_ceil_rounds_up_fraction_past_boundary() {
        let period = BillingPeriod::from_secs(100).unwrap();
        let start = jan_1();

        assert_eq!(period.periods_between_ceil(start, start + Duration::milliseconds(200_500)), 3);
        assert_eq!(period.periods_between_ceil(start, start + Duration::microseconds(1)), 1);
    }

    #[test]
    fn test_ceil_is_zero_for_reversed_span() {
        let period = BillingPeriod::from_secs(100).unwrap();
        assert_eq!(period.periods_between_ceil(jan_1(), jan_1() - Duration::days(3)), 0);
    }

    #[test]
    fn test_advance() {
        let period = BillingPeriod::from_secs(60).unwrap();
        assert_eq!(period.advance(jan_1(), 0).unwrap(), jan_1());
        assert_eq!(period.advance(jan_1(), 3).unwrap(), jan_1() + Duration::minutes(3));
    }
}

mod billing_window {
    use super::*;

    #[test]
    fn test_window_spans_one_period() {
        let period = BillingPeriod::default();
        let window = BillingWindow::starting_at(jan_1(), period).unwrap();
        assert_eq!(window.start, jan_1());
        assert_eq!(window.end - window.start, Duration::days(30));
    }

    #[test]
    fn test_window_closes_at_end() {
        let window = BillingWindow::starting_at(jan_1(), BillingPeriod::default()).unwrap();
        assert!(!window.has_elapsed(window.end - Duration::seconds(1)));
        assert!(window.has_elapsed(window.end));
    }

    #[test]
    fn test_advance_keeps_one_period_length() {
        let period = BillingPeriod::default();
        let window = BillingWindow::starting_at(jan_1(), period).unwrap();
        let advanced = window.advanced_by(4, period).unwrap();
        assert_eq!(advanced.start, jan_1() + Duration::days(120));
        assert_eq!(advanced.end - advanced.start, Duration::days(30));
    }
}

#[test]
fn test_system_clock_is_close_to_now() {
    let before = Utc::now();
    let now = SystemClock.now();
    assert!(now >= before);
}
