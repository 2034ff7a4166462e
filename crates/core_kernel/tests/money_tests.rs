//! Unit tests for token amounts and reference-currency values
//!
//! Tests cover checked arithmetic, whole-period division, and the
//! floor-rounded USD conversion used by the registration floors.

use core_kernel::{MoneyError, TokenAmount, UsdValue, TOKEN_DECIMALS};
use rust_decimal_macros::dec;

/// $2000.00000000 per whole token
const RATE_2000: i128 = 2_000 * 100_000_000;

mod token_amount {
    use super::*;

    #[test]
    fn test_from_whole_scales_by_token_decimals() {
        let amount = TokenAmount::from_whole(5);
        assert_eq!(amount.units(), 5 * 10u128.pow(TOKEN_DECIMALS));
    }

    #[test]
    fn test_zero() {
        assert!(TokenAmount::ZERO.is_zero());
        assert!(!TokenAmount::new(1).is_zero());
    }

    #[test]
    fn test_checked_mul_by_periods() {
        let fee = TokenAmount::new(1_000);
        assert_eq!(fee.checked_mul(3).unwrap(), TokenAmount::new(3_000));
        assert_eq!(fee.checked_mul(0).unwrap(), TokenAmount::ZERO);
        assert!(matches!(
            TokenAmount::new(u128::MAX).checked_mul(2),
            Err(MoneyError::Overflow { op: "*", .. })
        ));
    }

    #[test]
    fn test_underflow_reports_operands() {
        let err = TokenAmount::new(5).checked_sub(TokenAmount::new(9)).unwrap_err();
        assert_eq!(err, MoneyError::Underflow { left: 5, right: 9 });
        assert!(err.to_string().contains("9"));
    }

    #[test]
    fn test_checked_sum() {
        let total = TokenAmount::checked_sum([1u128, 2, 3].into_iter().map(TokenAmount::new)).unwrap();
        assert_eq!(total, TokenAmount::new(6));
    }

    #[test]
    fn test_display_in_whole_tokens() {
        let amount = TokenAmount::new(1_500_000_000_000_000_000);
        assert_eq!(amount.to_decimal(), Some(dec!(1.5)));
        assert_eq!(amount.to_string(), "1.5 TKN");
    }
}

mod usd_value {
    use super::*;

    #[test]
    fn test_from_dollars_uses_eight_decimals() {
        assert_eq!(UsdValue::from_dollars(1).raw(), 100_000_000);
    }

    #[test]
    fn test_conversion_at_floor_boundary() {
        // $50 at $2000/token is 0.025 token
        let fee = TokenAmount::new(25_000_000_000_000_000);
        let value = UsdValue::from_token_amount(fee, RATE_2000).unwrap();
        assert_eq!(value, UsdValue::from_dollars(50));

        let below = TokenAmount::new(fee.units() - 1);
        let value = UsdValue::from_token_amount(below, RATE_2000).unwrap();
        assert!(value < UsdValue::from_dollars(50));
    }

    #[test]
    fn test_conversion_rejects_negative_rate() {
        assert_eq!(
            UsdValue::from_token_amount(TokenAmount::from_whole(1), -5),
            Err(MoneyError::InvalidRate(-5))
        );
    }

    #[test]
    fn test_conversion_of_zero_is_zero() {
        let value = UsdValue::from_token_amount(TokenAmount::ZERO, RATE_2000).unwrap();
        assert_eq!(value, UsdValue::ZERO);
    }
}
