//! Token amounts and reference-currency values
//!
//! Ledger balances are held in the native integer units of the settlement
//! token (18 decimals). Reference-currency (USD) values use a fixed 8-decimal
//! convention, matching the price feed answers and the registration floors.
//!
//! All arithmetic is checked: a ledger balance can never wrap or go negative.

use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Decimal places of the settlement token
pub const TOKEN_DECIMALS: u32 = 18;

/// Decimal places of reference-currency values and price answers
pub const USD_DECIMALS: u32 = 8;

/// Errors that can occur during amount arithmetic
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Overflow during calculation: {left} {op} {right}")]
    Overflow {
        left: u128,
        op: &'static str,
        right: u128,
    },

    #[error("Underflow: cannot subtract {right} from {left}")]
    Underflow { left: u128, right: u128 },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid rate: {0}")]
    InvalidRate(i128),
}

/// An amount of the settlement token in its smallest unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);

    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    /// Creates an amount from whole tokens (`whole * 10^18` units)
    pub fn from_whole(whole: u64) -> Self {
        Self(whole as u128 * 10u128.pow(TOKEN_DECIMALS))
    }

    pub const fn units(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: TokenAmount) -> Result<TokenAmount, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(TokenAmount)
            .ok_or(MoneyError::Overflow {
                left: self.0,
                op: "+",
                right: other.0,
            })
    }

    pub fn checked_sub(&self, other: TokenAmount) -> Result<TokenAmount, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(TokenAmount)
            .ok_or(MoneyError::Underflow {
                left: self.0,
                right: other.0,
            })
    }

    /// Multiplies by a whole number of billing periods
    pub fn checked_mul(&self, factor: u64) -> Result<TokenAmount, MoneyError> {
        self.0
            .checked_mul(factor as u128)
            .map(TokenAmount)
            .ok_or(MoneyError::Overflow {
                left: self.0,
                op: "*",
                right: factor as u128,
            })
    }

    /// Number of whole `unit`s that fit in this amount
    pub fn whole_multiples_of(&self, unit: TokenAmount) -> Result<u64, MoneyError> {
        if unit.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        Ok(u64::try_from(self.0 / unit.0).unwrap_or(u64::MAX))
    }

    /// Adds up `amounts`, failing on the first overflow
    pub fn checked_sum<I>(amounts: I) -> Result<TokenAmount, MoneyError>
    where
        I: IntoIterator<Item = TokenAmount>,
    {
        amounts
            .into_iter()
            .try_fold(TokenAmount::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// Returns the amount as a decimal number of whole tokens
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::try_from_i128_with_scale(i128::try_from(self.0).ok()?, TOKEN_DECIMALS).ok()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "{} TKN", d.normalize()),
            None => write!(f, "{} units", self.0),
        }
    }
}

/// A reference-currency value with 8 decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsdValue(u128);

impl UsdValue {
    pub const ZERO: UsdValue = UsdValue(0);

    /// Creates a value from its raw 8-decimal representation
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Creates a value from whole dollars
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars as u128 * 100_000_000)
    }

    pub const fn raw(&self) -> u128 {
        self.0
    }

    /// Values a token amount at `rate` (USD per whole token, 8 decimals)
    ///
    /// Computes `floor(amount * rate / 10^18)`. The product is formed in 256
    /// bits so no precision is lost before the division.
    pub fn from_token_amount(amount: TokenAmount, rate: i128) -> Result<UsdValue, MoneyError> {
        if rate <= 0 {
            return Err(MoneyError::InvalidRate(rate));
        }
        let product = U256::from(amount.units()) * U256::from(rate as u128);
        let value = product / U256::exp10(TOKEN_DECIMALS as usize);
        if value.bits() > 128 {
            return Err(MoneyError::Overflow {
                left: amount.units(),
                op: "*",
                right: rate as u128,
            });
        }
        Ok(UsdValue(value.low_u128()))
    }

    /// Returns the value as a decimal number of dollars
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::try_from_i128_with_scale(i128::try_from(self.0).ok()?, USD_DECIMALS).ok()
    }
}

impl fmt::Display for UsdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "$ {:.2}", d),
            None => write!(f, "$ {}e-8", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_checked_arithmetic() {
        let a = TokenAmount::new(100);
        let b = TokenAmount::new(40);

        assert_eq!(a.checked_add(b).unwrap(), TokenAmount::new(140));
        assert_eq!(a.checked_sub(b).unwrap(), TokenAmount::new(60));
        assert!(matches!(b.checked_sub(a), Err(MoneyError::Underflow { .. })));
        assert!(matches!(
            TokenAmount::new(u128::MAX).checked_add(TokenAmount::new(1)),
            Err(MoneyError::Overflow { .. })
        ));
    }

    #[test]
    fn test_checked_sum_reports_overflow() {
        let amounts = [TokenAmount::new(u128::MAX - 1), TokenAmount::new(1), TokenAmount::new(1)];
        assert!(matches!(
            TokenAmount::checked_sum(amounts),
            Err(MoneyError::Overflow { .. })
        ));
        assert_eq!(TokenAmount::checked_sum(amounts[..2].iter().copied()).unwrap(), TokenAmount::new(u128::MAX));
        assert_eq!(TokenAmount::checked_sum(Vec::new()).unwrap(), TokenAmount::ZERO);
    }

    #[test]
    fn test_whole_multiples() {
        let balance = TokenAmount::new(250);
        assert_eq!(balance.whole_multiples_of(TokenAmount::new(100)).unwrap(), 2);
        assert_eq!(
            balance.whole_multiples_of(TokenAmount::ZERO),
            Err(MoneyError::DivisionByZero)
        );
    }

    #[test]
    fn test_usd_conversion_floors() {
        // 1 token at $2000.00000000
        let rate = 2_000 * 100_000_000i128;
        let value = UsdValue::from_token_amount(TokenAmount::from_whole(1), rate).unwrap();
        assert_eq!(value, UsdValue::from_dollars(2_000));

        // 1 unit of the token is worth less than 1e-8 USD
        let dust = UsdValue::from_token_amount(TokenAmount::new(1), rate).unwrap();
        assert_eq!(dust, UsdValue::ZERO);
    }

    #[test]
    fn test_usd_conversion_does_not_overflow_intermediate() {
        let amount = TokenAmount::new(u128::MAX / 2);
        let rate = 100_000_000i128;
        let value = UsdValue::from_token_amount(amount, rate).unwrap();
        assert_eq!(value.raw(), (u128::MAX / 2) / 10u128.pow(10));
    }

    #[test]
    fn test_usd_conversion_rejects_non_positive_rate() {
        let result = UsdValue::from_token_amount(TokenAmount::from_whole(1), 0);
        assert_eq!(result, Err(MoneyError::InvalidRate(0)));
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(UsdValue::from_dollars(50).to_decimal(), Some(dec!(50.00000000)));
        assert_eq!(UsdValue::from_dollars(50).to_string(), "$ 50.00");
        assert_eq!(TokenAmount::from_whole(3).to_decimal(), Some(dec!(3)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn usd_conversion_is_monotonic(
            a in 0u128..1_000_000_000_000_000_000_000u128,
            b in 0u128..1_000_000_000_000_000_000_000u128,
            rate in 1i128..1_000_000_000_000i128
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let lo_value = UsdValue::from_token_amount(TokenAmount::new(lo), rate).unwrap();
            let hi_value = UsdValue::from_token_amount(TokenAmount::new(hi), rate).unwrap();
            prop_assert!(lo_value <= hi_value);
        }

        #[test]
        fn whole_multiples_never_exceed_balance(
            balance in 0u128..1_000_000_000_000u128,
            unit in 1u128..1_000_000u128
        ) {
            let n = TokenAmount::new(balance).whole_multiples_of(TokenAmount::new(unit)).unwrap();
            let charged = TokenAmount::new(unit).checked_mul(n).unwrap();
            prop_assert!(charged <= TokenAmount::new(balance));
        }
    }
}
