//! Accrual engine
//!
//! Converts elapsed time into charges. A *settlement pass* looks at one
//! subscription, works out how many billing periods have become due since its
//! window closed, and charges the subscriber as many of them as the balance
//! covers:
//!
//! ```text
//!                 ┌──── balance covers all ────► Active, window advanced
//! window closed ──┼──── covers some (>1 due) ──► Paused, window advanced by what was paid
//!                 └──── covers none ───────────► Paused, window unchanged
//! ```
//!
//! Three entry points share the pass: one pair, every subscriber of a
//! provider, or a bounded slice of them. Each credits the provider once with
//! the total it collected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use core_kernel::{BillingPeriod, BillingWindow, Capability, ProviderId, SubscriberId, TokenAmount};

use crate::engine::BillingEngine;
use crate::error::BillingError;
use crate::events::{LedgerEvent, PauseReason};
use crate::ledger::LedgerStore;
use crate::subscription::{Subscription, SubscriptionState};

/// What a settlement pass did to one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    /// Nothing was due
    NotDue,
    /// Every due period was paid
    Settled,
    /// Some due periods were paid before the balance ran out
    PartiallySettled,
    /// Not a single due period could be paid
    Unaffordable,
}

/// Result of settling one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub subscriber_id: SubscriberId,
    pub provider_id: ProviderId,
    /// Amount moved from the subscriber to the provider
    pub collected: TokenAmount,
    /// Periods paid for by this pass
    pub months_charged: u64,
    pub kind: SettlementKind,
    /// State of the subscription after the pass
    pub state: SubscriptionState,
}

/// Result of settling every subscriber of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub total_earnings: TokenAmount,
    pub outcomes: Vec<SettlementOutcome>,
}

/// Result of settling one slice of a provider's subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total_earnings: TokenAmount,
    /// Cursor for the next call; 0 once the pass is complete
    pub next_start_index: usize,
    pub is_complete: bool,
    pub outcomes: Vec<SettlementOutcome>,
}

/// Planned effect of one settlement pass, not yet applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settlement {
    pub outcome: SettlementOutcome,
    pub subscription: Subscription,
    pub subscriber_balance: TokenAmount,
}

impl Settlement {
    fn changed(&self) -> bool {
        self.outcome.kind != SettlementKind::NotDue
    }
}

/// Number of periods due on `subscription` at `now`
fn months_due(subscription: &Subscription, period: BillingPeriod, now: DateTime<Utc>) -> u64 {
    let end = subscription.billing_end();
    match subscription.state {
        SubscriptionState::Active => period.periods_between_ceil(end, now).max(1),
        SubscriptionState::Paused { paused_at } if paused_at >= end => {
            period.periods_between_ceil(end, paused_at)
        }
        SubscriptionState::Paused { .. } => 0,
    }
}

/// Plans one settlement pass without touching any state
///
/// `balance` is the subscriber's current balance and `fee` the provider's fee.
pub(crate) fn settle(
    subscription: &Subscription,
    balance: TokenAmount,
    fee: TokenAmount,
    period: BillingPeriod,
    now: DateTime<Utc>,
) -> Result<Settlement, BillingError> {
    let unchanged = |kind: SettlementKind| Settlement {
        outcome: SettlementOutcome {
            subscriber_id: subscription.subscriber_id,
            provider_id: subscription.provider_id,
            collected: TokenAmount::ZERO,
            months_charged: 0,
            kind,
            state: subscription.state,
        },
        subscription: subscription.clone(),
        subscriber_balance: balance,
    };

    if !subscription.window.has_elapsed(now) {
        return Ok(unchanged(SettlementKind::NotDue));
    }
    let months = months_due(subscription, period, now);
    if months == 0 {
        return Ok(unchanged(SettlementKind::NotDue));
    }

    let owed = fee.checked_mul(months)?;
    let (charged_months, state, kind) = if balance >= owed {
        (months, SubscriptionState::Active, SettlementKind::Settled)
    } else {
        let affordable = if months > 1 {
            balance.whole_multiples_of(fee)?.min(months)
        } else {
            0
        };
        let kind = if affordable > 0 {
            SettlementKind::PartiallySettled
        } else {
            SettlementKind::Unaffordable
        };
        (affordable, SubscriptionState::Paused { paused_at: now }, kind)
    };

    let collected = fee.checked_mul(charged_months)?;
    let window = if charged_months > 0 {
        subscription.window.advanced_by(charged_months, period)?
    } else {
        subscription.window
    };

    Ok(Settlement {
        outcome: SettlementOutcome {
            subscriber_id: subscription.subscriber_id,
            provider_id: subscription.provider_id,
            collected,
            months_charged: charged_months,
            kind,
            state,
        },
        subscription: Subscription {
            window,
            state,
            ..subscription.clone()
        },
        subscriber_balance: balance.checked_sub(collected)?,
    })
}

impl BillingEngine {
    /// Settles a single subscription on behalf of its provider
    ///
    /// # Errors
    ///
    /// - `InvalidSubscription` if the pair is not enrolled
    /// - `Unauthorized` if the caller does not own the provider
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn process_subscription(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        subscriber_id: SubscriberId,
        provider_id: ProviderId,
    ) -> Result<SettlementOutcome, BillingError> {
        if !store.is_enrolled(subscriber_id, provider_id) {
            return Err(BillingError::InvalidSubscription {
                subscriber_id,
                provider_id,
            });
        }
        self.owned_provider(store, caller, provider_id, "process subscription")?;

        let (_, mut outcomes) = self.settle_members(store, provider_id, &[subscriber_id])?;
        outcomes.pop().ok_or(BillingError::InvalidSubscription {
            subscriber_id,
            provider_id,
        })
    }

    /// Settles every subscriber of the caller's provider
    ///
    /// A provider with no subscribers, or none due, earns zero.
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn process_all_subscriptions(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        provider_id: ProviderId,
    ) -> Result<SettlementReport, BillingError> {
        self.owned_provider(store, caller, provider_id, "process subscriptions")?;

        let members = store.subscribers_of(provider_id);
        let (total_earnings, outcomes) = self.settle_members(store, provider_id, &members)?;
        Ok(SettlementReport {
            total_earnings,
            outcomes,
        })
    }

    /// Settles the slice `[start_index, start_index + batch_size)` of the
    /// caller's provider's subscribers, ordered by id
    ///
    /// Pass the returned `next_start_index` to the following call until
    /// `is_complete`. The cursor is not checked for continuity: an
    /// out-of-range start settles nothing and reports completion.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the caller does not own the provider
    /// - `InvalidBatchSize` if `batch_size` is zero
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn process_subscriptions_batch(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        provider_id: ProviderId,
        start_index: usize,
        batch_size: usize,
    ) -> Result<BatchReport, BillingError> {
        self.owned_provider(store, caller, provider_id, "process subscriptions")?;
        if batch_size == 0 {
            return Err(BillingError::InvalidBatchSize);
        }

        let members = store.subscribers_of(provider_id);
        let count = members.len();
        let end = start_index.saturating_add(batch_size).min(count);
        let begin = start_index.min(end);
        let is_complete = end >= count;

        let (total_earnings, outcomes) = self.settle_members(store, provider_id, &members[begin..end])?;
        let next_start_index = if is_complete { 0 } else { end };

        debug!(begin, end, count, is_complete, "Batch settled");
        Ok(BatchReport {
            total_earnings,
            next_start_index,
            is_complete,
            outcomes,
        })
    }

    /// Reactivates a paused subscription
    ///
    /// Adds `top_up` (which may be zero) to the subscriber's balance, opens a
    /// fresh window starting now and pays its first period immediately.
    /// Returns the fee charged.
    ///
    /// # Errors
    ///
    /// - `NotRegistered` / `Unauthorized` for the subscriber
    /// - `InvalidSubscription` if the pair is not enrolled
    /// - `NotPaused` if the subscription is active
    /// - `ProviderInactive` if the provider stopped accepting subscribers
    /// - `InsufficientBalance` if the topped-up balance does not cover one fee
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn resume_subscription(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        subscriber_id: SubscriberId,
        provider_id: ProviderId,
        top_up: TokenAmount,
    ) -> Result<TokenAmount, BillingError> {
        let subscriber = self.owned_subscriber(store, caller, subscriber_id, "resume subscription")?;
        let subscription = store
            .subscription(subscriber_id, provider_id)
            .ok_or(BillingError::InvalidSubscription {
                subscriber_id,
                provider_id,
            })?;
        if !subscription.is_paused() {
            return Err(BillingError::NotPaused {
                subscriber_id,
                provider_id,
            });
        }
        let provider = store
            .provider(provider_id)
            .ok_or_else(|| BillingError::provider_not_registered(provider_id))?;
        if !provider.is_active {
            return Err(BillingError::ProviderInactive(provider_id));
        }

        let fee = provider.fee;
        let available = subscriber.current_balance.checked_add(top_up)?;
        if available < fee {
            return Err(BillingError::InsufficientBalance {
                requested: fee,
                available,
            });
        }
        let total_deposits = subscriber.total_deposits.checked_add(top_up)?;
        let remaining = available.checked_sub(fee)?;
        let provider_balance = provider.credited(fee)?;

        let now = self.now();
        let resumed = Subscription {
            window: BillingWindow::starting_at(now, self.period())?,
            state: SubscriptionState::Active,
            ..subscription.clone()
        };

        if !top_up.is_zero() {
            self.transfer.pull(caller.identity(), top_up)?;
        }

        store.set_subscriber_balances(subscriber_id, remaining, total_deposits);
        store.set_provider_balance(provider_id, provider_balance);
        store.put_subscription(resumed);
        if !top_up.is_zero() {
            store.record(
                now,
                LedgerEvent::DepositIncreased {
                    subscriber_id,
                    amount: top_up,
                    current_balance: remaining,
                },
            );
        }
        store.record(
            now,
            LedgerEvent::SubscriptionResumed {
                subscriber_id,
                provider_id,
                charged: fee,
            },
        );

        info!(%subscriber_id, %provider_id, %fee, %top_up, "Subscription resumed");
        Ok(fee)
    }

    /// Plans a settlement pass over `members` and applies it in one step
    ///
    /// The provider is credited once with the sum collected.
    fn settle_members(
        &self,
        store: &mut LedgerStore,
        provider_id: ProviderId,
        members: &[SubscriberId],
    ) -> Result<(TokenAmount, Vec<SettlementOutcome>), BillingError> {
        let now = self.now();
        let provider = store
            .provider(provider_id)
            .ok_or_else(|| BillingError::provider_not_registered(provider_id))?;
        let fee = provider.fee;

        let mut plan = Vec::with_capacity(members.len());
        let mut total = TokenAmount::ZERO;
        for &subscriber_id in members {
            let subscription = store
                .subscription(subscriber_id, provider_id)
                .ok_or(BillingError::InvalidSubscription {
                    subscriber_id,
                    provider_id,
                })?;
            let subscriber = store
                .subscriber(subscriber_id)
                .ok_or_else(|| BillingError::subscriber_not_registered(subscriber_id))?;

            let settlement = settle(subscription, subscriber.current_balance, fee, self.period(), now)?;
            total = total.checked_add(settlement.outcome.collected)?;
            plan.push(settlement);
        }
        let provider_balance = provider.credited(total)?;

        let mut outcomes = Vec::with_capacity(plan.len());
        for settlement in plan {
            if settlement.changed() {
                let outcome = settlement.outcome;
                store.set_subscriber_balance(outcome.subscriber_id, settlement.subscriber_balance);
                store.put_subscription(settlement.subscription);
                if outcome.kind != SettlementKind::Settled {
                    store.record(
                        now,
                        LedgerEvent::SubscriptionPaused {
                            subscriber_id: outcome.subscriber_id,
                            provider_id,
                            reason: PauseReason::InsufficientBalance,
                        },
                    );
                    warn!(
                        subscriber_id = %outcome.subscriber_id,
                        %provider_id,
                        months_charged = outcome.months_charged,
                        "Subscription paused for insufficient balance"
                    );
                }
            }
            outcomes.push(settlement.outcome);
        }
        store.set_provider_balance(provider_id, provider_balance);
        store.record(
            now,
            LedgerEvent::EarningsSettled {
                provider_id,
                amount: total,
                subscriptions_processed: outcomes.len(),
            },
        );

        info!(%provider_id, earnings = %total, processed = outcomes.len(), "Settlement applied");
        Ok((total, outcomes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const FEE: TokenAmount = TokenAmount::new(100);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn period() -> BillingPeriod {
        BillingPeriod::default()
    }

    fn subscription() -> Subscription {
        let window = BillingWindow::starting_at(t0(), period()).unwrap();
        Subscription::new(SubscriberId::new(1), ProviderId::new(1), window)
    }

    #[test]
    fn test_not_due_before_window_closes() {
        let now = t0() + Duration::days(29);
        let settlement = settle(&subscription(), TokenAmount::new(500), FEE, period(), now).unwrap();
        assert_eq!(settlement.outcome.kind, SettlementKind::NotDue);
        assert!(settlement.outcome.collected.is_zero());
        assert_eq!(settlement.subscription, subscription());
    }

    #[test]
    fn test_window_close_charges_one_period() {
        let now = t0() + Duration::days(30);
        let settlement = settle(&subscription(), TokenAmount::new(500), FEE, period(), now).unwrap();
        assert_eq!(settlement.outcome.kind, SettlementKind::Settled);
        assert_eq!(settlement.outcome.months_charged, 1);
        assert_eq!(settlement.outcome.collected, FEE);
        assert_eq!(settlement.subscriber_balance, TokenAmount::new(400));
        assert_eq!(settlement.subscription.window.start, t0() + Duration::days(30));
        assert_eq!(settlement.subscription.window.end, t0() + Duration::days(60));
    }

    #[test]
    fn test_partial_periods_round_up() {
        // 30 days + 1 hour past the end: two periods due
        let now = t0() + Duration::days(60) + Duration::hours(1);
        let settlement = settle(&subscription(), TokenAmount::new(500), FEE, period(), now).unwrap();
        assert_eq!(settlement.outcome.months_charged, 2);
        assert_eq!(settlement.outcome.collected, TokenAmount::new(200));
        assert_eq!(settlement.subscription.window.start, t0() + Duration::days(60));
    }

    #[test]
    fn test_fraction_of_a_second_past_boundary_counts_a_period() {
        let now = t0() + Duration::days(60) + Duration::milliseconds(500);
        let settlement = settle(&subscription(), TokenAmount::new(1_000), FEE, period(), now).unwrap();
        assert_eq!(settlement.outcome.months_charged, 2);
        assert_eq!(settlement.subscription.window.end, t0() + Duration::days(90));
        assert!(settlement.subscription.window.end > now);

        let again = settle(
            &settlement.subscription,
            settlement.subscriber_balance,
            FEE,
            period(),
            now,
        )
        .unwrap();
        assert_eq!(again.outcome.kind, SettlementKind::NotDue);
        assert!(again.outcome.collected.is_zero());
    }

    #[test]
    fn test_partial_payment_pauses() {
        let now = t0() + Duration::days(91);
        let settlement = settle(&subscription(), TokenAmount::new(250), FEE, period(), now).unwrap();
        assert_eq!(settlement.outcome.kind, SettlementKind::PartiallySettled);
        assert_eq!(settlement.outcome.months_charged, 2);
        assert_eq!(settlement.subscriber_balance, TokenAmount::new(50));
        assert_eq!(settlement.subscription.state, SubscriptionState::Paused { paused_at: now });
        assert_eq!(settlement.subscription.window.start, t0() + Duration::days(60));
    }

    #[test]
    fn test_unaffordable_single_period_pauses_without_charge() {
        let now = t0() + Duration::days(31);
        let settlement = settle(&subscription(), TokenAmount::new(99), FEE, period(), now).unwrap();
        assert_eq!(settlement.outcome.kind, SettlementKind::Unaffordable);
        assert!(settlement.outcome.collected.is_zero());
        assert_eq!(settlement.subscriber_balance, TokenAmount::new(99));
        assert_eq!(settlement.subscription.window, subscription().window);
        assert!(settlement.subscription.is_paused());
    }

    #[test]
    fn test_paused_before_window_end_owes_nothing() {
        let paused = subscription().paused(t0() + Duration::days(10));
        let now = t0() + Duration::days(200);
        let settlement = settle(&paused, TokenAmount::new(500), FEE, period(), now).unwrap();
        assert_eq!(settlement.outcome.kind, SettlementKind::NotDue);
        assert_eq!(settlement.subscription, paused);
    }

    #[test]
    fn test_paused_charges_only_through_pause() {
        // paused 40 days in: one period (days 30..60) was in use
        let paused = subscription().paused(t0() + Duration::days(40));
        let now = t0() + Duration::days(200);
        let settlement = settle(&paused, TokenAmount::new(500), FEE, period(), now).unwrap();
        assert_eq!(settlement.outcome.months_charged, 1);
        assert_eq!(settlement.outcome.collected, FEE);
        assert_eq!(settlement.subscription.state, SubscriptionState::Active);
    }
}
