//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the ledger. Amounts are expressed in
//! whole tokens and the default exchange rate is one dollar per token, so the
//! registration floors are easy to reason about: a 50 token fee sits exactly
//! on the minimum fee, a 100 token deposit exactly on the minimum deposit.

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::{Capability, Identity, RegistrationToken, TokenAmount};

/// Raw 8-decimal rate for one dollar per token
pub const ONE_DOLLAR_RATE: i128 = 100_000_000;

/// Fixture for token amounts
pub struct AmountFixtures;

impl AmountFixtures {
    /// Fee worth exactly the minimum fee at the default rate
    pub fn min_fee() -> TokenAmount {
        TokenAmount::from_whole(50)
    }

    /// A typical provider fee
    pub fn fee() -> TokenAmount {
        TokenAmount::from_whole(60)
    }

    /// Deposit worth exactly the minimum deposit at the default rate
    pub fn min_deposit() -> TokenAmount {
        TokenAmount::from_whole(100)
    }

    /// One token unit less than `amount`
    pub fn one_unit_below(amount: TokenAmount) -> TokenAmount {
        TokenAmount::new(amount.units() - 1)
    }

    /// `periods` times `fee`
    pub fn periods_of(fee: TokenAmount, periods: u64) -> TokenAmount {
        fee.checked_mul(periods).unwrap()
    }
}

/// Fixture for time data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Ledger start time (Jan 1, 2024)
    pub fn ledger_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }
}

/// Fixture for caller identities
pub struct IdentityFixtures;

impl IdentityFixtures {
    pub fn administrator() -> Identity {
        Identity::from("ledger-admin")
    }

    pub fn provider(n: usize) -> Capability {
        Capability::new(Identity::new(format!("provider-{n}")))
    }

    pub fn subscriber(n: usize) -> Capability {
        Capability::new(Identity::new(format!("subscriber-{n}")))
    }

    pub fn outsider() -> Capability {
        Capability::new("outsider")
    }

    /// Registration token unique to `n`
    pub fn token(n: usize) -> RegistrationToken {
        RegistrationToken::new(format!("registration-token-{n}"))
    }
}
