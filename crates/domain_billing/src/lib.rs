//! Billing Domain - Subscription Billing Ledger
//!
//! This crate implements a prepaid subscription ledger. Providers register a
//! per-period fee; subscribers deposit funds, enroll with providers and pay
//! the first period up front. Settlement later converts elapsed time into
//! charges against the subscriber balance and credits the provider.
//!
//! # Ledger Rules
//!
//! - Fees and deposits must clear a reference-currency floor, valued through
//!   the price oracle at registration time
//! - A subscription is charged only for whole periods the balance can cover;
//!   when it runs short the subscription is paused
//! - Balances are unsigned and never created by settlement: value only moves
//!   from subscribers to providers, or across the custody boundary
//! - A failed operation leaves the store exactly as it was
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingConfig, BillingEngine};
//! use core_kernel::{Capability, RegistrationToken, TokenAmount};
//!
//! let engine = BillingEngine::new(config, admin, feed, custody, clock)?;
//! let mut store = engine.new_store();
//!
//! let alice = Capability::new("alice");
//! let provider = engine.register_provider(&mut store, &alice, RegistrationToken::new("t-1"), fee)?;
//!
//! let bob = Capability::new("bob");
//! let subscriber = engine.register_subscriber(&mut store, &bob, &[provider], deposit)?;
//!
//! // one period later
//! let report = engine.process_all_subscriptions(&mut store, &alice, provider)?;
//! engine.withdraw_earnings(&mut store, &alice, provider, report.total_earnings)?;
//! ```

pub mod accrual;
pub mod balance;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod oracle;
pub mod provider;
pub mod registry;
pub mod subscriber;
pub mod subscription;

pub use accrual::{BatchReport, SettlementKind, SettlementOutcome, SettlementReport};
pub use balance::Withdrawal;
pub use crate::config::BillingConfig;
pub use engine::BillingEngine;
pub use error::BillingError;
pub use events::{EventEnvelope, LedgerEvent, PauseReason};
pub use ledger::LedgerStore;
pub use oracle::PriceOracle;
pub use provider::Provider;
pub use subscriber::Subscriber;
pub use subscription::{Subscription, SubscriptionState};
