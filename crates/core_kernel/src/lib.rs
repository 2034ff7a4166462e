//! Core Kernel - Foundational types for the subscription ledger
//!
//! This crate provides the building blocks shared by the billing domain:
//! - Sequential identifiers, owner identities, and caller capabilities
//! - Token amounts and 8-decimal reference-currency values
//! - Billing periods, windows, and the injected clock
//! - Ports to the price feed and the token custody system

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{TokenAmount, UsdValue, MoneyError, TOKEN_DECIMALS, USD_DECIMALS};
pub use temporal::{BillingPeriod, BillingWindow, Clock, SystemClock, TemporalError};
pub use identifiers::{
    ProviderId, SubscriberId, EventId, Identity, Capability, RegistrationToken,
};
pub use ports::{PortError, DomainPort, PriceAnswer, PriceFeed, ValueTransfer};
pub use error::CoreError;
