//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for ledger state that give more
//! meaningful error messages than standard assertions.

use core_kernel::{ProviderId, SubscriberId, TokenAmount};
use domain_billing::{LedgerStore, SubscriptionState};

use crate::doubles::RecordingTransfer;

/// Asserts a provider's accrued balance
///
/// # Panics
///
/// Panics if the provider does not exist or the balance differs
pub fn assert_provider_balance(store: &LedgerStore, id: ProviderId, expected: TokenAmount) {
    let provider = store
        .provider(id)
        .unwrap_or_else(|| panic!("Provider {} not found", id));
    assert_eq!(
        provider.balance, expected,
        "Provider {} balance mismatch: actual={}, expected={}",
        id, provider.balance, expected
    );
}

/// Asserts a subscriber's spendable balance
///
/// # Panics
///
/// Panics if the subscriber does not exist or the balance differs
pub fn assert_subscriber_balance(store: &LedgerStore, id: SubscriberId, expected: TokenAmount) {
    let subscriber = store
        .subscriber(id)
        .unwrap_or_else(|| panic!("Subscriber {} not found", id));
    assert_eq!(
        subscriber.current_balance, expected,
        "Subscriber {} balance mismatch: actual={}, expected={}",
        id, subscriber.current_balance, expected
    );
}

/// Asserts that a subscription exists and is paused
pub fn assert_paused(store: &LedgerStore, subscriber_id: SubscriberId, provider_id: ProviderId) {
    let subscription = store
        .subscription(subscriber_id, provider_id)
        .unwrap_or_else(|| panic!("No subscription for {} with {}", subscriber_id, provider_id));
    assert!(
        subscription.is_paused(),
        "Expected subscription of {} with {} to be paused, got {:?}",
        subscriber_id,
        provider_id,
        subscription.state
    );
}

/// Asserts that a subscription exists and is active
pub fn assert_active(store: &LedgerStore, subscriber_id: SubscriberId, provider_id: ProviderId) {
    let subscription = store
        .subscription(subscriber_id, provider_id)
        .unwrap_or_else(|| panic!("No subscription for {} with {}", subscriber_id, provider_id));
    assert_eq!(
        subscription.state,
        SubscriptionState::Active,
        "Expected subscription of {} with {} to be active",
        subscriber_id,
        provider_id
    );
}

/// Asserts that the ledger holds exactly what custody received minus what it paid out
///
/// Settlement only moves value between participants, so this holds after
/// every operation.
pub fn assert_custody_conserved(store: &LedgerStore, transfer: &RecordingTransfer) {
    let pulled = transfer.total_pulled();
    let pushed = transfer.total_pushed();
    let expected = pulled
        .checked_sub(pushed)
        .unwrap_or_else(|_| panic!("Custody paid out {} but only received {}", pushed, pulled));
    let held = store
        .custody_total()
        .unwrap_or_else(|e| panic!("Custody total overflowed: {}", e));
    assert_eq!(
        held, expected,
        "Custody mismatch: ledger holds {}, transfers net {}",
        held, expected
    );
}
