//! Subscription records and subscriber-initiated pausing
//!
//! A subscription links one subscriber to one provider and carries the
//! billing window already paid for. Its state is either `Active` or `Paused`;
//! the accrual engine moves between the two during settlement, and the
//! subscriber can pause explicitly at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::{BillingWindow, Capability, ProviderId, SubscriberId};

use crate::engine::BillingEngine;
use crate::error::BillingError;
use crate::events::{LedgerEvent, PauseReason};
use crate::ledger::LedgerStore;

/// Billing state of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubscriptionState {
    /// Billed every period
    Active,
    /// Billing stopped at `paused_at`
    Paused { paused_at: DateTime<Utc> },
}

/// The enrollment of one subscriber with one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber_id: SubscriberId,
    pub provider_id: ProviderId,
    /// Interval already paid for
    pub window: BillingWindow,
    pub state: SubscriptionState,
}

impl Subscription {
    /// Creates an active subscription whose first window is already paid
    pub fn new(subscriber_id: SubscriberId, provider_id: ProviderId, window: BillingWindow) -> Self {
        Self {
            subscriber_id,
            provider_id,
            window,
            state: SubscriptionState::Active,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, SubscriptionState::Paused { .. })
    }

    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SubscriptionState::Paused { paused_at } => Some(paused_at),
            SubscriptionState::Active => None,
        }
    }

    pub fn billing_start(&self) -> DateTime<Utc> {
        self.window.start
    }

    pub fn billing_end(&self) -> DateTime<Utc> {
        self.window.end
    }

    pub(crate) fn paused(&self, at: DateTime<Utc>) -> Self {
        Self {
            state: SubscriptionState::Paused { paused_at: at },
            ..self.clone()
        }
    }
}

impl BillingEngine {
    /// Pauses a subscription immediately
    ///
    /// Only the subscriber's owner may pause. The pause is unconditional and
    /// does not settle anything; billing stops accruing at the current time.
    ///
    /// # Errors
    ///
    /// - `NotRegistered` if the subscriber does not exist
    /// - `Unauthorized` if the caller does not own the subscriber
    /// - `InvalidSubscription` if the pair is not enrolled
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn pause_subscription(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        subscriber_id: SubscriberId,
        provider_id: ProviderId,
    ) -> Result<(), BillingError> {
        self.owned_subscriber(store, caller, subscriber_id, "pause subscription")?;
        let subscription = store
            .subscription(subscriber_id, provider_id)
            .ok_or(BillingError::InvalidSubscription {
                subscriber_id,
                provider_id,
            })?;

        let now = self.now();
        let paused = subscription.paused(now);
        store.put_subscription(paused);
        store.record(
            now,
            LedgerEvent::SubscriptionPaused {
                subscriber_id,
                provider_id,
                reason: PauseReason::Requested,
            },
        );

        info!(%subscriber_id, %provider_id, "Subscription paused by subscriber");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_kernel::BillingPeriod;

    #[test]
    fn test_pause_keeps_window() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let window = BillingWindow::starting_at(start, BillingPeriod::default()).unwrap();
        let subscription = Subscription::new(SubscriberId::new(1), ProviderId::new(1), window);
        assert!(!subscription.is_paused());

        let at = start + chrono::Duration::days(3);
        let paused = subscription.paused(at);
        assert!(paused.is_paused());
        assert_eq!(paused.paused_at(), Some(at));
        assert_eq!(paused.window, window);
    }
}
