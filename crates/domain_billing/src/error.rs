//! Billing domain errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use core_kernel::{
    CoreError, Identity, MoneyError, PortError, ProviderId, RegistrationToken, SubscriberId,
    TemporalError, TokenAmount, UsdValue,
};

/// Errors that can occur in the billing domain
///
/// Every failure is detected before the store is mutated, so an error always
/// means the call had no effect.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Registration token was already consumed
    #[error("Registration token already used: {0}")]
    TokenAlreadyUsed(RegistrationToken),

    /// Provider fee is below the reference-currency floor
    #[error("Invalid fee {fee}: worth {value}, minimum is {minimum}")]
    InvalidFee {
        fee: TokenAmount,
        value: UsdValue,
        minimum: UsdValue,
    },

    /// Subscriber deposit is below the reference-currency floor
    #[error("Invalid deposit {deposit}: worth {value}, minimum is {minimum}")]
    InvalidDeposit {
        deposit: TokenAmount,
        value: UsdValue,
        minimum: UsdValue,
    },

    /// Caller already owns an identifier of this kind
    #[error("{owner} is already registered as {role}")]
    AlreadyRegistered {
        owner: Identity,
        role: &'static str,
    },

    /// Provider capacity reached
    #[error("Provider capacity of {capacity} reached")]
    CapacityExceeded { capacity: usize },

    /// Enrollment names too many providers
    #[error("Too many providers in one enrollment: {requested} (maximum {maximum})")]
    TooManyProviders { requested: usize, maximum: usize },

    /// Enrollment names the same provider twice
    #[error("Provider {0} named more than once")]
    DuplicateProvider(ProviderId),

    /// Provider is not accepting subscribers
    #[error("Provider {0} is not active")]
    ProviderInactive(ProviderId),

    /// Deposit does not cover the first period of every named provider
    #[error("Insufficient deposit: {deposit} does not cover required {required}")]
    InsufficientDeposit {
        deposit: TokenAmount,
        required: TokenAmount,
    },

    /// No subscription exists for the pair
    #[error("No subscription for subscriber {subscriber_id} with provider {provider_id}")]
    InvalidSubscription {
        subscriber_id: SubscriberId,
        provider_id: ProviderId,
    },

    /// Entity was never registered
    #[error("{entity} {id} is not registered")]
    NotRegistered { entity: &'static str, id: u64 },

    /// Caller does not hold the required identity
    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        caller: Identity,
        action: &'static str,
    },

    /// Balance does not cover the requested amount
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: TokenAmount,
        available: TokenAmount,
    },

    /// Subscription is not paused
    #[error("Subscription of subscriber {subscriber_id} with provider {provider_id} is not paused")]
    NotPaused {
        subscriber_id: SubscriberId,
        provider_id: ProviderId,
    },

    /// Batch size of zero would never make progress
    #[error("Batch size must be positive")]
    InvalidBatchSize,

    /// Identifier sequence exhausted
    #[error("No identifiers left for {0}")]
    IdentifiersExhausted(&'static str),

    /// The price feed returned no usable answer
    #[error("Price oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// The price answer is older than allowed
    #[error("Stale price: updated at {updated_at}, maximum age {max_age_secs}s")]
    StalePrice {
        updated_at: DateTime<Utc>,
        max_age_secs: u64,
    },

    /// The price answer is not a positive rate
    #[error("Invalid price: {0}")]
    InvalidPrice(i128),

    /// The token custody system failed the transfer
    #[error("Transfer failed: {0}")]
    Transfer(#[from] PortError),

    /// Amount arithmetic failed
    #[error("Calculation error: {0}")]
    Money(#[from] MoneyError),

    /// Billing window arithmetic failed
    #[error("Billing window error: {0}")]
    Temporal(#[from] TemporalError),

    /// Ledger configuration is invalid
    #[error("Configuration error: {0}")]
    Configuration(#[from] CoreError),
}

impl BillingError {
    pub(crate) fn provider_not_registered(id: ProviderId) -> Self {
        BillingError::NotRegistered {
            entity: "provider",
            id: id.value(),
        }
    }

    pub(crate) fn subscriber_not_registered(id: SubscriberId) -> Self {
        BillingError::NotRegistered {
            entity: "subscriber",
            id: id.value(),
        }
    }

    pub(crate) fn unauthorized(caller: &Identity, action: &'static str) -> Self {
        BillingError::Unauthorized {
            caller: caller.clone(),
            action,
        }
    }

    /// Returns true if retrying after the precondition changes may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::OracleUnavailable(_) | BillingError::StalePrice { .. } => true,
            BillingError::Transfer(port) => port.is_transient(),
            _ => false,
        }
    }
}
