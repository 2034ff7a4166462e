//! Test Data Builders
//!
//! `LedgerScenarioBuilder` wires a `BillingEngine` to in-memory ports and an
//! empty store, so a test only states what differs from the defaults:
//!
//! ```rust,ignore
//! let mut scenario = LedgerScenarioBuilder::new().with_capacity(3).build();
//! let provider = scenario.provider(1, AmountFixtures::fee());
//! let subscriber = scenario.subscriber(1, &[provider], AmountFixtures::min_deposit());
//! scenario.advance_periods(1);
//! ```

use chrono::{DateTime, Duration, Utc};
use core_kernel::{Capability, Clock, Identity, ProviderId, SubscriberId, TokenAmount};
use domain_billing::{BillingConfig, BillingEngine, LedgerStore};
use std::sync::Arc;

use crate::doubles::{InMemoryPriceFeed, ManualClock, RecordingTransfer};
use crate::fixtures::{IdentityFixtures, TemporalFixtures, ONE_DOLLAR_RATE};

/// Builder for a ready-to-use ledger
pub struct LedgerScenarioBuilder {
    config: BillingConfig,
    administrator: Identity,
    start: DateTime<Utc>,
    rate: i128,
}

impl Default for LedgerScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerScenarioBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            config: BillingConfig::default(),
            administrator: IdentityFixtures::administrator(),
            start: TemporalFixtures::ledger_start(),
            rate: ONE_DOLLAR_RATE,
        }
    }

    /// Replaces the whole configuration
    pub fn with_config(mut self, config: BillingConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the provider capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.provider_capacity = capacity;
        self
    }

    /// Sets the billing period length
    pub fn with_period_secs(mut self, secs: u64) -> Self {
        self.config.period_secs = secs;
        self
    }

    /// Sets the starting time of the clock
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Sets the raw 8-decimal exchange rate
    pub fn with_rate(mut self, rate: i128) -> Self {
        self.rate = rate;
        self
    }

    /// Builds the scenario
    pub fn build(self) -> LedgerScenario {
        let clock = Arc::new(ManualClock::new(self.start));
        let feed = Arc::new(InMemoryPriceFeed::new(clock.clone() as Arc<dyn Clock>, self.rate));
        let transfer = Arc::new(RecordingTransfer::new());

        let engine = BillingEngine::new(
            self.config,
            self.administrator.clone(),
            feed.clone(),
            transfer.clone(),
            clock.clone(),
        )
        .expect("scenario configuration must be valid");
        let store = engine.new_store();

        LedgerScenario {
            engine,
            store,
            clock,
            feed,
            transfer,
            administrator: Capability::new(self.administrator),
        }
    }
}

/// An engine, its store and handles to the in-memory ports
pub struct LedgerScenario {
    pub engine: BillingEngine,
    pub store: LedgerStore,
    pub clock: Arc<ManualClock>,
    pub feed: Arc<InMemoryPriceFeed>,
    pub transfer: Arc<RecordingTransfer>,
    pub administrator: Capability,
}

impl LedgerScenario {
    /// Registers `IdentityFixtures::provider(n)` with its own token
    pub fn provider(&mut self, n: usize, fee: TokenAmount) -> ProviderId {
        self.engine
            .register_provider(
                &mut self.store,
                &IdentityFixtures::provider(n),
                IdentityFixtures::token(n),
                fee,
            )
            .expect("provider registration should succeed")
    }

    /// Registers `IdentityFixtures::subscriber(n)` with the given providers
    pub fn subscriber(&mut self, n: usize, providers: &[ProviderId], deposit: TokenAmount) -> SubscriberId {
        self.engine
            .register_subscriber(&mut self.store, &IdentityFixtures::subscriber(n), providers, deposit)
            .expect("subscriber registration should succeed")
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Moves the clock forward by whole billing periods
    pub fn advance_periods(&self, periods: i64) {
        let secs = self.engine.period().as_secs() as i64;
        self.clock.advance(Duration::seconds(secs * periods));
    }

    pub fn provider_balance(&self, id: ProviderId) -> TokenAmount {
        self.store.provider(id).expect("provider exists").balance
    }

    pub fn subscriber_balance(&self, id: SubscriberId) -> TokenAmount {
        self.store.subscriber(id).expect("subscriber exists").current_balance
    }
}
