//! Ledger notifications
//!
//! Events are informational: they are recorded after the corresponding state
//! change commits and are never read back by the engine. Observers drain them
//! from the store with [`LedgerStore::take_events`](crate::LedgerStore::take_events).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{EventId, Identity, ProviderId, SubscriberId, TokenAmount, UsdValue};

/// Why a subscription stopped billing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// The subscriber asked for it
    Requested,
    /// Settlement found the balance too low
    InsufficientBalance,
}

/// Significant state changes of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    ProviderRegistered {
        provider_id: ProviderId,
        owner: Identity,
        fee: TokenAmount,
    },

    /// Provider left the ledger; `swept` is the balance paid out on exit
    ProviderUnregistered {
        provider_id: ProviderId,
        swept: TokenAmount,
    },

    ProviderStatusChanged {
        provider_id: ProviderId,
        is_active: bool,
    },

    SubscriberRegistered {
        subscriber_id: SubscriberId,
        owner: Identity,
        deposit: TokenAmount,
        provider_ids: Vec<ProviderId>,
    },

    DepositIncreased {
        subscriber_id: SubscriberId,
        amount: TokenAmount,
        current_balance: TokenAmount,
    },

    SubscriptionPaused {
        subscriber_id: SubscriberId,
        provider_id: ProviderId,
        reason: PauseReason,
    },

    SubscriptionResumed {
        subscriber_id: SubscriberId,
        provider_id: ProviderId,
        charged: TokenAmount,
    },

    /// Earnings credited to a provider by one settlement call
    EarningsSettled {
        provider_id: ProviderId,
        amount: TokenAmount,
        subscriptions_processed: usize,
    },

    EarningsWithdrawn {
        provider_id: ProviderId,
        amount: TokenAmount,
        value: Option<UsdValue>,
    },
}

/// A recorded event with its identity and time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}

impl EventEnvelope {
    pub fn new(recorded_at: DateTime<Utc>, event: LedgerEvent) -> Self {
        Self {
            id: EventId::new_v7(),
            recorded_at,
            event,
        }
    }

    /// Serializes the envelope for external observers
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
