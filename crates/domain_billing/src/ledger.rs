//! The ledger store
//!
//! `LedgerStore` owns every record and index of the ledger. It is passed
//! explicitly to each engine operation; there is no global state.
//!
//! # Invariants
//!
//! - Identifiers are handed out in strictly increasing order and never reused
//! - Each owner identity maps to at most one provider and one subscriber
//! - A subscription exists for `(s, p)` iff `s` is in provider `p`'s set
//! - Balances are unsigned and only change through checked arithmetic
//!
//! Mutators are crate-private: only the engine, after it has validated and
//! planned a whole operation, writes to the store.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};

use core_kernel::{Identity, MoneyError, ProviderId, RegistrationToken, SubscriberId, TokenAmount};

use crate::events::{EventEnvelope, LedgerEvent};
use crate::provider::Provider;
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;

/// All ledger state
#[derive(Debug, Clone)]
pub struct LedgerStore {
    providers: HashMap<ProviderId, Provider>,
    subscribers: HashMap<SubscriberId, Subscriber>,
    subscriptions: HashMap<(SubscriberId, ProviderId), Subscription>,
    /// Provider to enrolled subscribers, ordered by id for stable batching
    members: HashMap<ProviderId, BTreeSet<SubscriberId>>,
    provider_owners: HashMap<Identity, ProviderId>,
    subscriber_owners: HashMap<Identity, SubscriberId>,
    used_tokens: HashSet<RegistrationToken>,
    next_provider_id: ProviderId,
    next_subscriber_id: SubscriberId,
    events: Vec<EventEnvelope>,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new(1)
    }
}

impl LedgerStore {
    /// Creates an empty store whose identifiers start at `first_id`
    pub fn new(first_id: u64) -> Self {
        Self {
            providers: HashMap::new(),
            subscribers: HashMap::new(),
            subscriptions: HashMap::new(),
            members: HashMap::new(),
            provider_owners: HashMap::new(),
            subscriber_owners: HashMap::new(),
            used_tokens: HashSet::new(),
            next_provider_id: ProviderId::new(first_id),
            next_subscriber_id: SubscriberId::new(first_id),
            events: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn provider(&self, id: ProviderId) -> Option<&Provider> {
        self.providers.get(&id)
    }

    pub fn subscriber(&self, id: SubscriberId) -> Option<&Subscriber> {
        self.subscribers.get(&id)
    }

    pub fn subscription(&self, subscriber_id: SubscriberId, provider_id: ProviderId) -> Option<&Subscription> {
        self.subscriptions.get(&(subscriber_id, provider_id))
    }

    /// Subscribers enrolled with a provider, in ascending id order
    pub fn subscribers_of(&self, provider_id: ProviderId) -> Vec<SubscriberId> {
        self.members
            .get(&provider_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, provider_id: ProviderId) -> usize {
        self.members.get(&provider_id).map_or(0, BTreeSet::len)
    }

    pub fn is_enrolled(&self, subscriber_id: SubscriberId, provider_id: ProviderId) -> bool {
        self.members
            .get(&provider_id)
            .is_some_and(|set| set.contains(&subscriber_id))
    }

    /// Number of providers ever registered, active or not
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn provider_id_of(&self, owner: &Identity) -> Option<ProviderId> {
        self.provider_owners.get(owner).copied()
    }

    pub fn subscriber_id_of(&self, owner: &Identity) -> Option<SubscriberId> {
        self.subscriber_owners.get(owner).copied()
    }

    pub fn is_token_used(&self, token: &RegistrationToken) -> bool {
        self.used_tokens.contains(token)
    }

    /// Total value held for participants: subscriber balances plus provider earnings
    pub fn custody_total(&self) -> Result<TokenAmount, MoneyError> {
        let subscribers = self.subscribers.values().map(|s| s.current_balance);
        let providers = self.providers.values().map(|p| p.balance);
        TokenAmount::checked_sum(subscribers.chain(providers))
    }

    pub(crate) fn peek_provider_id(&self) -> ProviderId {
        self.next_provider_id
    }

    pub(crate) fn peek_subscriber_id(&self) -> SubscriberId {
        self.next_subscriber_id
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Recorded events not yet taken
    pub fn events(&self) -> &[EventEnvelope] {
        &self.events
    }

    /// Returns recorded events and clears them
    pub fn take_events(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn record(&mut self, at: DateTime<Utc>, event: LedgerEvent) {
        self.events.push(EventEnvelope::new(at, event));
    }

    // ------------------------------------------------------------------
    // Mutators (infallible; callers validate first)
    // ------------------------------------------------------------------

    /// Stores a new provider and advances the provider sequence past its id
    pub(crate) fn insert_provider(&mut self, provider: Provider, token: RegistrationToken, next_id: ProviderId) {
        self.used_tokens.insert(token);
        self.provider_owners.insert(provider.owner.clone(), provider.id);
        self.providers.insert(provider.id, provider);
        self.next_provider_id = next_id;
    }

    /// Stores a new subscriber and advances the subscriber sequence past its id
    pub(crate) fn insert_subscriber(&mut self, subscriber: Subscriber, next_id: SubscriberId) {
        self.subscriber_owners.insert(subscriber.owner.clone(), subscriber.id);
        self.subscribers.insert(subscriber.id, subscriber);
        self.next_subscriber_id = next_id;
    }

    pub(crate) fn set_provider_balance(&mut self, id: ProviderId, balance: TokenAmount) {
        if let Some(provider) = self.providers.get_mut(&id) {
            provider.balance = balance;
        }
    }

    pub(crate) fn set_provider_active(&mut self, id: ProviderId, is_active: bool) {
        if let Some(provider) = self.providers.get_mut(&id) {
            provider.is_active = is_active;
        }
    }

    pub(crate) fn set_subscriber_balances(
        &mut self,
        id: SubscriberId,
        current_balance: TokenAmount,
        total_deposits: TokenAmount,
    ) {
        if let Some(subscriber) = self.subscribers.get_mut(&id) {
            subscriber.current_balance = current_balance;
            subscriber.total_deposits = total_deposits;
        }
    }

    pub(crate) fn set_subscriber_balance(&mut self, id: SubscriberId, current_balance: TokenAmount) {
        if let Some(subscriber) = self.subscribers.get_mut(&id) {
            subscriber.current_balance = current_balance;
        }
    }

    /// Enrolls the subscription's subscriber with its provider, or replaces the record
    pub(crate) fn put_subscription(&mut self, subscription: Subscription) {
        self.members
            .entry(subscription.provider_id)
            .or_default()
            .insert(subscription.subscriber_id);
        self.subscriptions
            .insert((subscription.subscriber_id, subscription.provider_id), subscription);
    }

    /// Drops every subscription of a provider along with its member set
    pub(crate) fn clear_members(&mut self, provider_id: ProviderId) -> usize {
        let Some(set) = self.members.remove(&provider_id) else {
            return 0;
        };
        for subscriber_id in &set {
            self.subscriptions.remove(&(*subscriber_id, provider_id));
        }
        set.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_kernel::{BillingPeriod, BillingWindow};

    fn window() -> BillingWindow {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        BillingWindow::starting_at(start, BillingPeriod::default()).unwrap()
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = LedgerStore::new(10);
        assert_eq!(store.provider_count(), 0);
        assert_eq!(store.peek_provider_id(), ProviderId::new(10));
        assert_eq!(store.peek_subscriber_id(), SubscriberId::new(10));
        assert!(store.custody_total().unwrap().is_zero());
    }

    #[test]
    fn test_custody_total_reports_overflow() {
        let mut store = LedgerStore::default();
        for raw in [1u64, 2] {
            let id = ProviderId::new(raw);
            let owner = Identity::new(format!("owner-{}", raw));
            store.insert_provider(
                Provider::new(id, owner, TokenAmount::new(1)),
                RegistrationToken::new(format!("token-{}", raw)),
                ProviderId::new(raw + 1),
            );
            store.set_provider_balance(id, TokenAmount::new(u128::MAX / 2 + 1));
        }
        assert!(matches!(store.custody_total(), Err(MoneyError::Overflow { .. })));

        store.set_provider_balance(ProviderId::new(2), TokenAmount::new(5));
        assert_eq!(
            store.custody_total().unwrap(),
            TokenAmount::new(u128::MAX / 2 + 6)
        );
    }

    #[test]
    fn test_membership_and_records_stay_consistent() {
        let mut store = LedgerStore::default();
        let provider_id = ProviderId::new(1);

        for raw in [3u64, 1, 2] {
            store.put_subscription(Subscription::new(SubscriberId::new(raw), provider_id, window()));
        }

        assert_eq!(
            store.subscribers_of(provider_id),
            vec![SubscriberId::new(1), SubscriberId::new(2), SubscriberId::new(3)]
        );
        assert!(store.is_enrolled(SubscriberId::new(2), provider_id));
        assert!(store.subscription(SubscriberId::new(2), provider_id).is_some());

        assert_eq!(store.clear_members(provider_id), 3);
        assert_eq!(store.subscriber_count(provider_id), 0);
        assert!(store.subscription(SubscriberId::new(2), provider_id).is_none());
    }

    #[test]
    fn test_take_events_drains() {
        let mut store = LedgerStore::default();
        store.record(
            Utc::now(),
            LedgerEvent::ProviderStatusChanged {
                provider_id: ProviderId::new(1),
                is_active: false,
            },
        );
        assert_eq!(store.events().len(), 1);
        assert_eq!(store.take_events().len(), 1);
        assert!(store.events().is_empty());
    }
}
