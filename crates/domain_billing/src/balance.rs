//! Withdrawals and top-ups
//!
//! The two operations that move value across the ledger boundary outside of
//! registration: providers withdraw accrued earnings, subscribers add to
//! their spendable balance.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{Capability, ProviderId, SubscriberId, TokenAmount, UsdValue};

use crate::engine::BillingEngine;
use crate::error::BillingError;
use crate::events::LedgerEvent;
use crate::ledger::LedgerStore;

/// Receipt for a completed withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub provider_id: ProviderId,
    pub amount: TokenAmount,
    /// Reference-currency value at withdrawal time, if the oracle answered
    pub value: Option<UsdValue>,
}

impl BillingEngine {
    /// Pays `amount` of the caller's provider earnings out to the caller
    ///
    /// The reported value is informational: an oracle failure does not block
    /// the withdrawal and is reported as `None`.
    ///
    /// # Errors
    ///
    /// - `NotRegistered` if the provider does not exist
    /// - `Unauthorized` if the caller does not own the provider
    /// - `InsufficientBalance` if `amount` exceeds the provider balance
    /// - `Transfer` if the custody port refuses the payout
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn withdraw_earnings(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        provider_id: ProviderId,
        amount: TokenAmount,
    ) -> Result<Withdrawal, BillingError> {
        let provider = self.owned_provider(store, caller, provider_id, "withdraw earnings")?;
        let available = provider.balance;
        if amount > available {
            return Err(BillingError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        let remaining = available.checked_sub(amount)?;

        let now = self.now();
        let value = match self.oracle.value_in_reference_currency(amount, now) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(%provider_id, %error, "Withdrawal value unavailable");
                None
            }
        };

        self.transfer.push(caller.identity(), amount)?;

        store.set_provider_balance(provider_id, remaining);
        store.record(
            now,
            LedgerEvent::EarningsWithdrawn {
                provider_id,
                amount,
                value,
            },
        );

        info!(%provider_id, %amount, %remaining, "Earnings withdrawn");
        Ok(Withdrawal {
            provider_id,
            amount,
            value,
        })
    }

    /// Adds `amount` to the caller's subscriber balance
    ///
    /// Returns the new spendable balance. Paused subscriptions stay paused;
    /// use `resume_subscription` to restart one.
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn increase_deposit(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        subscriber_id: SubscriberId,
        amount: TokenAmount,
    ) -> Result<TokenAmount, BillingError> {
        let subscriber = self.owned_subscriber(store, caller, subscriber_id, "increase deposit")?;
        let current_balance = subscriber.current_balance.checked_add(amount)?;
        let total_deposits = subscriber.total_deposits.checked_add(amount)?;

        self.transfer.pull(caller.identity(), amount)?;

        store.set_subscriber_balances(subscriber_id, current_balance, total_deposits);
        store.record(
            self.now(),
            LedgerEvent::DepositIncreased {
                subscriber_id,
                amount,
                current_balance,
            },
        );

        info!(%subscriber_id, %amount, %current_balance, "Deposit increased");
        Ok(current_balance)
    }
}
