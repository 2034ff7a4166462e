//! Ports to external collaborators
//!
//! The ledger depends on two systems it does not own:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                BillingEngine                 │
//! └──────────────────────────────────────────────┘
//!            │                        │
//!            ▼                        ▼
//!   ┌─────────────────┐     ┌───────────────────┐
//!   │   PriceFeed     │     │   ValueTransfer   │
//!   │ (rate oracle)   │     │ (token custody)   │
//!   └─────────────────┘     └───────────────────┘
//! ```
//!
//! Adapters implement these traits; the engine only sees the trait objects.
//! Both ports are synchronous: each engine call is a single atomic unit of
//! work and never suspends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifiers::Identity;
use crate::money::TokenAmount;

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The external system is unavailable
    #[error("Service unavailable: {service}")]
    ServiceUnavailable {
        service: String,
    },

    /// The external system refused the operation
    #[error("Rejected by {service}: {message}")]
    Rejected {
        service: String,
        message: String,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    pub fn unavailable(service: impl Into<String>) -> Self {
        PortError::ServiceUnavailable {
            service: service.into(),
        }
    }

    pub fn rejected(service: impl Into<String>, message: impl Into<String>) -> Self {
        PortError::Rejected {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::ServiceUnavailable { .. })
    }
}

/// Marker trait for all ports
pub trait DomainPort: Send + Sync + 'static {}

/// A single answer from the exchange-rate feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAnswer {
    /// USD per whole token, 8 decimals
    pub rate: i128,
    /// When the feed last updated this answer
    pub updated_at: DateTime<Utc>,
}

/// External exchange-rate feed
pub trait PriceFeed: DomainPort {
    /// Returns the latest answer, or `None` if the feed has no data
    fn latest(&self) -> Result<Option<PriceAnswer>, PortError>;
}

/// External token custody
///
/// Both calls either complete fully or return an error; the engine relies on
/// that to keep its own state change atomic with the transfer.
pub trait ValueTransfer: DomainPort {
    /// Moves `amount` from `from` into ledger custody
    fn pull(&self, from: &Identity, amount: TokenAmount) -> Result<(), PortError>;

    /// Moves `amount` out of ledger custody to `to`
    fn push(&self, to: &Identity, amount: TokenAmount) -> Result<(), PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_transient() {
        assert!(PortError::unavailable("price-feed").is_transient());
        assert!(!PortError::rejected("custody", "allowance too low").is_transient());
        assert!(!PortError::internal("boom").is_transient());
    }

    #[test]
    fn test_port_error_display() {
        let error = PortError::rejected("custody", "allowance too low");
        assert!(error.to_string().contains("custody"));
        assert!(error.to_string().contains("allowance too low"));
    }
}
