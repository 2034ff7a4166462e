//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating ledger inputs that respect
//! the registration floors at the default one-dollar rate.

use chrono::Duration;
use core_kernel::TokenAmount;
use proptest::prelude::*;

/// Strategy for provider fees at or above the minimum fee (50..=500 tokens)
pub fn fee_strategy() -> impl Strategy<Value = TokenAmount> {
    (50u64..=500u64).prop_map(TokenAmount::from_whole)
}

/// Strategy for a deposit covering `fee` for between one and `max_periods` periods
///
/// The result also clears the 100 token minimum deposit.
pub fn deposit_for_fee_strategy(fee: TokenAmount, max_periods: u64) -> impl Strategy<Value = TokenAmount> {
    (1u64..=max_periods, 0u128..fee.units()).prop_map(move |(periods, extra)| {
        let covered = fee.checked_mul(periods).unwrap().checked_add(TokenAmount::new(extra)).unwrap();
        covered.max(TokenAmount::from_whole(100))
    })
}

/// Strategy for elapsed time, up to roughly a year with second precision
pub fn elapsed_strategy() -> impl Strategy<Value = Duration> {
    (0i64..31_536_000i64).prop_map(Duration::seconds)
}

/// Strategy for batch sizes
pub fn batch_size_strategy() -> impl Strategy<Value = usize> {
    1usize..8usize
}

/// Strategy for the number of subscribers enrolled with one provider
pub fn subscriber_count_strategy() -> impl Strategy<Value = usize> {
    0usize..12usize
}
