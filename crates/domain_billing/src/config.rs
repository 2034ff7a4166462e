//! Ledger configuration

use serde::Deserialize;

use core_kernel::temporal::DEFAULT_BILLING_PERIOD_SECS;
use core_kernel::{BillingPeriod, CoreError, UsdValue};

/// Billing ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Length of one billing period in seconds
    pub period_secs: u64,
    /// Maximum number of providers ever registered (active and inactive)
    pub provider_capacity: usize,
    /// Maximum number of providers named in one enrollment call
    pub max_providers_per_enrollment: usize,
    /// Minimum provider fee value, whole USD
    pub min_fee_dollars: u64,
    /// Minimum subscriber deposit value, whole USD
    pub min_deposit_dollars: u64,
    /// Maximum age of a price answer; `None` disables the staleness check
    pub oracle_max_staleness_secs: Option<u64>,
    /// First identifier handed out to providers and subscribers
    pub first_id: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            period_secs: DEFAULT_BILLING_PERIOD_SECS,
            provider_capacity: 200,
            max_providers_per_enrollment: 200,
            min_fee_dollars: 50,
            min_deposit_dollars: 100,
            oracle_max_staleness_secs: Some(3600),
            first_id: 1,
        }
    }
}

impl BillingConfig {
    /// Loads configuration from `BILLING_*` environment variables
    ///
    /// Unset variables keep their default value.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("BILLING").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Checks that the configuration describes a usable ledger
    pub fn validate(&self) -> Result<(), CoreError> {
        BillingPeriod::from_secs(self.period_secs)
            .map_err(|e| CoreError::configuration(format!("period_secs: {}", e)))?;
        if self.provider_capacity == 0 {
            return Err(CoreError::configuration("provider_capacity must be positive"));
        }
        if self.max_providers_per_enrollment == 0 {
            return Err(CoreError::configuration(
                "max_providers_per_enrollment must be positive",
            ));
        }
        if self.first_id == 0 {
            return Err(CoreError::configuration("first_id must be positive"));
        }
        Ok(())
    }

    pub fn period(&self) -> Result<BillingPeriod, CoreError> {
        Ok(BillingPeriod::from_secs(self.period_secs)?)
    }

    pub fn min_fee(&self) -> UsdValue {
        UsdValue::from_dollars(self.min_fee_dollars)
    }

    pub fn min_deposit(&self) -> UsdValue {
        UsdValue::from_dollars(self.min_deposit_dollars)
    }
}
