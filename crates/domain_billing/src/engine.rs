//! The billing engine service
//!
//! `BillingEngine` bundles the configuration and the injected collaborators
//! (price feed, token custody, clock) that every ledger operation needs. It
//! holds no ledger state itself: each operation receives the `LedgerStore`
//! it works on and the `Capability` of the authenticated caller.
//!
//! Operations are grouped by concern and implemented in their own modules:
//!
//! | module | operations |
//! |---|---|
//! | `registry` | `register_provider`, `register_subscriber`, `remove_provider`, `unregister_provider`, `change_provider_status` |
//! | `accrual` | `process_subscription`, `process_all_subscriptions`, `process_subscriptions_batch`, `resume_subscription` |
//! | `balance` | `withdraw_earnings`, `increase_deposit` |
//! | `subscription` | `pause_subscription` |
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_billing::{BillingConfig, BillingEngine};
//! use core_kernel::{Capability, Identity, SystemClock};
//!
//! let engine = BillingEngine::new(
//!     BillingConfig::from_env()?,
//!     Identity::from("admin"),
//!     Arc::new(feed),
//!     Arc::new(custody),
//!     Arc::new(SystemClock),
//! )?;
//! let mut store = engine.new_store();
//!
//! let provider_id = engine.register_provider(&mut store, &Capability::new("alice"), token, fee)?;
//! ```

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use core_kernel::{BillingPeriod, Capability, Clock, Identity, PriceFeed, ProviderId, SubscriberId, ValueTransfer};

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::ledger::LedgerStore;
use crate::oracle::PriceOracle;
use crate::provider::Provider;
use crate::subscriber::Subscriber;

/// Entry point for all ledger operations
pub struct BillingEngine {
    config: BillingConfig,
    period: BillingPeriod,
    administrator: Identity,
    pub(crate) oracle: PriceOracle,
    pub(crate) transfer: Arc<dyn ValueTransfer>,
    clock: Arc<dyn Clock>,
}

impl BillingEngine {
    /// Creates an engine after validating the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Ledger configuration
    /// * `administrator` - Identity allowed to change provider status
    /// * `feed` - Exchange-rate feed used for the fee and deposit floors
    /// * `transfer` - Token custody that moves value in and out of the ledger
    /// * `clock` - Source of the current time
    pub fn new(
        config: BillingConfig,
        administrator: Identity,
        feed: Arc<dyn PriceFeed>,
        transfer: Arc<dyn ValueTransfer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BillingError> {
        config.validate()?;
        let period = config.period()?;
        let oracle = PriceOracle::new(feed, config.oracle_max_staleness_secs);

        Ok(Self {
            config,
            period,
            administrator,
            oracle,
            transfer,
            clock,
        })
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn period(&self) -> BillingPeriod {
        self.period
    }

    pub fn administrator(&self) -> &Identity {
        &self.administrator
    }

    /// Creates an empty store numbered from the configured first identifier
    pub fn new_store(&self) -> LedgerStore {
        LedgerStore::new(self.config.first_id)
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Looks up a provider and checks that `caller` owns it
    pub(crate) fn owned_provider<'s>(
        &self,
        store: &'s LedgerStore,
        caller: &Capability,
        provider_id: ProviderId,
        action: &'static str,
    ) -> Result<&'s Provider, BillingError> {
        let provider = store
            .provider(provider_id)
            .ok_or_else(|| BillingError::provider_not_registered(provider_id))?;
        if !provider.is_owned_by(caller.identity()) {
            return Err(BillingError::unauthorized(caller.identity(), action));
        }
        Ok(provider)
    }

    /// Looks up a subscriber and checks that `caller` owns it
    pub(crate) fn owned_subscriber<'s>(
        &self,
        store: &'s LedgerStore,
        caller: &Capability,
        subscriber_id: SubscriberId,
        action: &'static str,
    ) -> Result<&'s Subscriber, BillingError> {
        let subscriber = store
            .subscriber(subscriber_id)
            .ok_or_else(|| BillingError::subscriber_not_registered(subscriber_id))?;
        if !subscriber.is_owned_by(caller.identity()) {
            return Err(BillingError::unauthorized(caller.identity(), action));
        }
        Ok(subscriber)
    }
}

impl fmt::Debug for BillingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BillingEngine")
            .field("config", &self.config)
            .field("administrator", &self.administrator)
            .finish_non_exhaustive()
    }
}
