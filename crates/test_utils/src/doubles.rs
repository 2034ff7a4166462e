//! In-memory Port Implementations
//!
//! Deterministic stand-ins for the collaborators the engine depends on:
//!
//! - `ManualClock`: time only moves when a test advances it
//! - `InMemoryPriceFeed`: a settable exchange rate, stamped with the clock's time
//! - `RecordingTransfer`: records every pull and push, and can be told to refuse

use chrono::{DateTime, Duration, Utc};
use core_kernel::{
    Clock, DomainPort, Identity, PortError, PriceAnswer, PriceFeed, TokenAmount, ValueTransfer,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A price feed whose answer is set by the test
///
/// By default answers are stamped with the current time of the shared clock,
/// so they never go stale; `pin_updated_at` fixes the timestamp instead.
pub struct InMemoryPriceFeed {
    clock: Arc<dyn Clock>,
    rate: Mutex<Option<i128>>,
    pinned_at: Mutex<Option<DateTime<Utc>>>,
    failing: AtomicBool,
}

impl InMemoryPriceFeed {
    pub fn new(clock: Arc<dyn Clock>, rate: i128) -> Self {
        Self {
            clock,
            rate: Mutex::new(Some(rate)),
            pinned_at: Mutex::new(None),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_rate(&self, rate: i128) {
        *self.rate.lock().unwrap() = Some(rate);
    }

    /// Makes the feed answer with no data
    pub fn clear(&self) {
        *self.rate.lock().unwrap() = None;
    }

    pub fn pin_updated_at(&self, at: DateTime<Utc>) {
        *self.pinned_at.lock().unwrap() = Some(at);
    }

    /// Makes every query fail with a transient error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DomainPort for InMemoryPriceFeed {}

impl PriceFeed for InMemoryPriceFeed {
    fn latest(&self) -> Result<Option<PriceAnswer>, PortError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::unavailable("price-feed"));
        }
        let updated_at = self.pinned_at.lock().unwrap().unwrap_or_else(|| self.clock.now());
        Ok(self
            .rate
            .lock()
            .unwrap()
            .map(|rate| PriceAnswer { rate, updated_at }))
    }
}

/// Direction of a recorded transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Into ledger custody
    Pull,
    /// Out of ledger custody
    Push,
}

/// One transfer seen by `RecordingTransfer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub direction: TransferDirection,
    pub party: Identity,
    pub amount: TokenAmount,
}

/// Token custody that records transfers instead of moving anything
#[derive(Debug, Default)]
pub struct RecordingTransfer {
    records: Mutex<Vec<TransferRecord>>,
    failing: AtomicBool,
}

impl RecordingTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every transfer fail with a rejection
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<TransferRecord> {
        self.records.lock().unwrap().clone()
    }

    fn total(&self, direction: TransferDirection) -> TokenAmount {
        let records = self.records.lock().unwrap();
        let amounts = records
            .iter()
            .filter(|r| r.direction == direction)
            .map(|r| r.amount);
        TokenAmount::checked_sum(amounts).expect("recorded transfers overflow")
    }

    /// Sum of all amounts moved into custody
    pub fn total_pulled(&self) -> TokenAmount {
        self.total(TransferDirection::Pull)
    }

    /// Sum of all amounts moved out of custody
    pub fn total_pushed(&self) -> TokenAmount {
        self.total(TransferDirection::Push)
    }

    /// Amount moved out of custody to `party`
    pub fn pushed_to(&self, party: &Identity) -> TokenAmount {
        let records = self.records.lock().unwrap();
        let amounts = records
            .iter()
            .filter(|r| r.direction == TransferDirection::Push && &r.party == party)
            .map(|r| r.amount);
        TokenAmount::checked_sum(amounts).expect("recorded transfers overflow")
    }

    fn transfer(&self, direction: TransferDirection, party: &Identity, amount: TokenAmount) -> Result<(), PortError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError::rejected("custody", "transfer refused"));
        }
        self.records.lock().unwrap().push(TransferRecord {
            direction,
            party: party.clone(),
            amount,
        });
        Ok(())
    }
}

impl DomainPort for RecordingTransfer {}

impl ValueTransfer for RecordingTransfer {
    fn pull(&self, from: &Identity, amount: TokenAmount) -> Result<(), PortError> {
        self.transfer(TransferDirection::Pull, from, amount)
    }

    fn push(&self, to: &Identity, amount: TokenAmount) -> Result<(), PortError> {
        self.transfer(TransferDirection::Push, to, amount)
    }
}
