//! Price oracle adapter
//!
//! Converts token amounts into the reference currency for the registration
//! floors and withdrawal reports. Every conversion goes through
//! [`PriceOracle::value_in_reference_currency`].

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use core_kernel::{MoneyError, PriceAnswer, PriceFeed, TokenAmount, UsdValue};

use crate::error::BillingError;

/// Wraps a `PriceFeed` with availability and staleness checks
pub struct PriceOracle {
    feed: Arc<dyn PriceFeed>,
    max_staleness_secs: Option<u64>,
}

impl PriceOracle {
    pub fn new(feed: Arc<dyn PriceFeed>, max_staleness_secs: Option<u64>) -> Self {
        Self {
            feed,
            max_staleness_secs,
        }
    }

    /// Returns the latest usable answer at `now`
    ///
    /// # Errors
    ///
    /// - `OracleUnavailable` if the feed fails or has no data
    /// - `StalePrice` if the answer is older than the configured maximum age
    pub fn latest(&self, now: DateTime<Utc>) -> Result<PriceAnswer, BillingError> {
        let answer = self
            .feed
            .latest()
            .map_err(|e| BillingError::OracleUnavailable(e.to_string()))?
            .ok_or_else(|| BillingError::OracleUnavailable("feed returned no data".to_string()))?;

        if let Some(max_age_secs) = self.max_staleness_secs {
            let age = (now - answer.updated_at).num_seconds();
            if age > 0 && age as u64 > max_age_secs {
                return Err(BillingError::StalePrice {
                    updated_at: answer.updated_at,
                    max_age_secs,
                });
            }
        }
        Ok(answer)
    }

    /// Values `amount` in the reference currency, rounding down
    pub fn value_in_reference_currency(
        &self,
        amount: TokenAmount,
        now: DateTime<Utc>,
    ) -> Result<UsdValue, BillingError> {
        let answer = self.latest(now)?;
        let value = UsdValue::from_token_amount(amount, answer.rate).map_err(|e| match e {
            MoneyError::InvalidRate(rate) => BillingError::InvalidPrice(rate),
            other => BillingError::Money(other),
        })?;

        debug!(%amount, rate = answer.rate, %value, "Valued amount");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use core_kernel::{DomainPort, PortError};

    struct FixedFeed(Result<Option<PriceAnswer>, ()>);

    impl DomainPort for FixedFeed {}

    impl PriceFeed for FixedFeed {
        fn latest(&self) -> Result<Option<PriceAnswer>, PortError> {
            self.0.map_err(|_| PortError::unavailable("price-feed"))
        }
    }

    fn oracle(answer: Result<Option<PriceAnswer>, ()>) -> PriceOracle {
        PriceOracle::new(Arc::new(FixedFeed(answer)), Some(60))
    }

    #[test]
    fn test_values_at_latest_rate() {
        let now = Utc::now();
        let oracle = oracle(Ok(Some(PriceAnswer {
            rate: 2_000 * 100_000_000,
            updated_at: now,
        })));
        let value = oracle
            .value_in_reference_currency(TokenAmount::from_whole(2), now)
            .unwrap();
        assert_eq!(value, UsdValue::from_dollars(4_000));
    }

    #[test]
    fn test_missing_answer_is_unavailable() {
        let now = Utc::now();
        assert!(matches!(
            oracle(Ok(None)).value_in_reference_currency(TokenAmount::new(1), now),
            Err(BillingError::OracleUnavailable(_))
        ));
        assert!(matches!(
            oracle(Err(())).value_in_reference_currency(TokenAmount::new(1), now),
            Err(BillingError::OracleUnavailable(_))
        ));
    }

    #[test]
    fn test_stale_answer_is_rejected() {
        let now = Utc::now();
        let oracle = oracle(Ok(Some(PriceAnswer {
            rate: 100_000_000,
            updated_at: now - Duration::seconds(61),
        })));
        assert!(matches!(
            oracle.value_in_reference_currency(TokenAmount::new(1), now),
            Err(BillingError::StalePrice { max_age_secs: 60, .. })
        ));
    }

    #[test]
    fn test_negative_rate_is_invalid() {
        let now = Utc::now();
        let oracle = oracle(Ok(Some(PriceAnswer {
            rate: -5,
            updated_at: now,
        })));
        assert!(matches!(
            oracle.value_in_reference_currency(TokenAmount::new(1), now),
            Err(BillingError::InvalidPrice(-5))
        ));
    }
}
