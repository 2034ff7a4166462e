//! Provider and subscriber registration
//!
//! Registration admits participants to the ledger. Each call checks every
//! precondition first, then pulls funds through the custody port, then
//! writes the store; a rejected registration leaves no trace.
//!
//! # Provider lifecycle
//!
//! ```text
//! register_provider ──► Active ◄──── change_provider_status ────► Inactive
//!                         │                                          ▲
//!                         ├── remove_provider ───────────────────────┤
//!                         └── unregister_provider (sweep + clear) ───┘
//! ```
//!
//! Inactive providers keep their record and still count toward capacity.

use std::collections::HashSet;
use tracing::{info, instrument, warn};

use core_kernel::{BillingWindow, Capability, ProviderId, RegistrationToken, SubscriberId, TokenAmount};

use crate::engine::BillingEngine;
use crate::error::BillingError;
use crate::events::LedgerEvent;
use crate::ledger::LedgerStore;
use crate::provider::Provider;
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;

impl BillingEngine {
    /// Registers the caller as a provider charging `fee` per billing period
    ///
    /// # Errors
    ///
    /// Checked in order:
    /// - `TokenAlreadyUsed` if the token was consumed before
    /// - `InvalidFee` if the fee is worth less than the minimum fee
    /// - `AlreadyRegistered` if the caller already owns a provider
    /// - `CapacityExceeded` if the provider capacity is reached
    ///
    /// Oracle failures surface as `OracleUnavailable`, `StalePrice` or `InvalidPrice`.
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn register_provider(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        token: RegistrationToken,
        fee: TokenAmount,
    ) -> Result<ProviderId, BillingError> {
        if store.is_token_used(&token) {
            return Err(BillingError::TokenAlreadyUsed(token));
        }

        let now = self.now();
        let value = self.oracle.value_in_reference_currency(fee, now)?;
        let minimum = self.config().min_fee();
        if value < minimum {
            return Err(BillingError::InvalidFee { fee, value, minimum });
        }

        let owner = caller.identity();
        if store.provider_id_of(owner).is_some() {
            return Err(BillingError::AlreadyRegistered {
                owner: owner.clone(),
                role: "provider",
            });
        }

        let capacity = self.config().provider_capacity;
        if store.provider_count() >= capacity {
            return Err(BillingError::CapacityExceeded { capacity });
        }

        let provider_id = store.peek_provider_id();
        let next_id = provider_id
            .next()
            .ok_or(BillingError::IdentifiersExhausted("providers"))?;

        store.insert_provider(Provider::new(provider_id, owner.clone(), fee), token, next_id);
        store.record(
            now,
            LedgerEvent::ProviderRegistered {
                provider_id,
                owner: owner.clone(),
                fee,
            },
        );

        info!(%provider_id, %fee, %value, "Provider registered");
        Ok(provider_id)
    }

    /// Registers the caller as a subscriber enrolled with `provider_ids`
    ///
    /// The first period of every named provider is paid from the deposit at
    /// enrollment. The remainder becomes the subscriber's spendable balance.
    ///
    /// # Errors
    ///
    /// Checked in order, all before any state changes:
    /// - `InvalidDeposit` if the deposit is worth less than the minimum deposit
    /// - `AlreadyRegistered` if the caller already owns a subscriber
    /// - `TooManyProviders` if more providers are named than one enrollment allows
    /// - per provider: `DuplicateProvider`, `NotRegistered`, `ProviderInactive`
    /// - `InsufficientDeposit` if the deposit does not cover the first fees
    /// - `Transfer` if the custody port refuses the deposit
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn register_subscriber(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        provider_ids: &[ProviderId],
        deposit: TokenAmount,
    ) -> Result<SubscriberId, BillingError> {
        let now = self.now();
        let value = self.oracle.value_in_reference_currency(deposit, now)?;
        let minimum = self.config().min_deposit();
        if value < minimum {
            return Err(BillingError::InvalidDeposit {
                deposit,
                value,
                minimum,
            });
        }

        let owner = caller.identity();
        if store.subscriber_id_of(owner).is_some() {
            return Err(BillingError::AlreadyRegistered {
                owner: owner.clone(),
                role: "subscriber",
            });
        }

        let maximum = self.config().max_providers_per_enrollment;
        if provider_ids.len() > maximum {
            return Err(BillingError::TooManyProviders {
                requested: provider_ids.len(),
                maximum,
            });
        }

        let mut seen = HashSet::with_capacity(provider_ids.len());
        let mut required = TokenAmount::ZERO;
        let mut credits = Vec::with_capacity(provider_ids.len());
        for &provider_id in provider_ids {
            if !seen.insert(provider_id) {
                return Err(BillingError::DuplicateProvider(provider_id));
            }
            let provider = store
                .provider(provider_id)
                .ok_or_else(|| BillingError::provider_not_registered(provider_id))?;
            if !provider.is_active {
                return Err(BillingError::ProviderInactive(provider_id));
            }
            required = required.checked_add(provider.fee)?;
            credits.push((provider_id, provider.credited(provider.fee)?));
        }

        if deposit < required {
            return Err(BillingError::InsufficientDeposit { deposit, required });
        }
        let current_balance = deposit.checked_sub(required)?;

        let subscriber_id = store.peek_subscriber_id();
        let next_id = subscriber_id
            .next()
            .ok_or(BillingError::IdentifiersExhausted("subscribers"))?;
        let window = BillingWindow::starting_at(now, self.period())?;

        self.transfer.pull(owner, deposit)?;

        store.insert_subscriber(
            Subscriber {
                id: subscriber_id,
                owner: owner.clone(),
                current_balance,
                total_deposits: deposit,
            },
            next_id,
        );
        for (provider_id, balance) in credits {
            store.set_provider_balance(provider_id, balance);
            store.put_subscription(Subscription::new(subscriber_id, provider_id, window));
        }
        store.record(
            now,
            LedgerEvent::SubscriberRegistered {
                subscriber_id,
                owner: owner.clone(),
                deposit,
                provider_ids: provider_ids.to_vec(),
            },
        );

        info!(
            %subscriber_id,
            %deposit,
            %required,
            providers = provider_ids.len(),
            "Subscriber registered"
        );
        Ok(subscriber_id)
    }

    /// Deactivates the caller's provider
    ///
    /// Existing subscriptions keep settling; the provider only stops accepting
    /// new subscribers.
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn remove_provider(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        provider_id: ProviderId,
    ) -> Result<(), BillingError> {
        self.owned_provider(store, caller, provider_id, "remove provider")?;

        store.set_provider_active(provider_id, false);
        store.record(
            self.now(),
            LedgerEvent::ProviderStatusChanged {
                provider_id,
                is_active: false,
            },
        );

        info!(%provider_id, "Provider deactivated by owner");
        Ok(())
    }

    /// Removes the caller's provider from the ledger
    ///
    /// Deactivates the provider, pays its remaining balance out to the owner
    /// and drops every subscription it had. The record itself is kept so the
    /// identifier is never reused. Returns the amount swept.
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn unregister_provider(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        provider_id: ProviderId,
    ) -> Result<TokenAmount, BillingError> {
        let provider = self.owned_provider(store, caller, provider_id, "unregister provider")?;
        let swept = provider.balance;

        if !swept.is_zero() {
            self.transfer.push(caller.identity(), swept)?;
        }

        store.set_provider_active(provider_id, false);
        store.set_provider_balance(provider_id, TokenAmount::ZERO);
        let dropped = store.clear_members(provider_id);
        store.record(self.now(), LedgerEvent::ProviderUnregistered { provider_id, swept });

        if dropped > 0 {
            warn!(%provider_id, dropped, "Subscriptions dropped with unregistered provider");
        }
        info!(%provider_id, %swept, "Provider unregistered");
        Ok(swept)
    }

    /// Sets a provider's active flag to the opposite of its current value
    ///
    /// Only the ledger administrator may call this. Returns the new flag.
    #[instrument(skip(self, store, caller), fields(caller = %caller.identity()))]
    pub fn change_provider_status(
        &self,
        store: &mut LedgerStore,
        caller: &Capability,
        provider_id: ProviderId,
    ) -> Result<bool, BillingError> {
        if !caller.is(self.administrator()) {
            return Err(BillingError::unauthorized(caller.identity(), "change provider status"));
        }
        let provider = store
            .provider(provider_id)
            .ok_or_else(|| BillingError::provider_not_registered(provider_id))?;
        let is_active = !provider.is_active;

        store.set_provider_active(provider_id, is_active);
        store.record(
            self.now(),
            LedgerEvent::ProviderStatusChanged {
                provider_id,
                is_active,
            },
        );

        info!(%provider_id, is_active, "Provider status changed");
        Ok(is_active)
    }
}
