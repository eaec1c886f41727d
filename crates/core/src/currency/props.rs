//! Property-based tests for currency conversion.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use super::conversion::{COMPANY_CURRENCY_DECIMALS, convert_amount};

/// Strategy to generate positive decimal amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate exchange rates (0.0100 to 10000.0000).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (100i64..100_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Converted amounts never carry more than two decimal places.
    #[test]
    fn prop_convert_rounds_to_company_precision(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let result = convert_amount(amount, rate, COMPANY_CURRENCY_DECIMALS);
        prop_assert!(result.scale() <= COMPANY_CURRENCY_DECIMALS);
    }

    /// Conversion matches half-even rounding of the exact product.
    #[test]
    fn prop_convert_is_half_even_of_product(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let exact = amount * rate;
        let result = convert_amount(amount, rate, COMPANY_CURRENCY_DECIMALS);
        prop_assert_eq!(
            result,
            exact.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
        );
        prop_assert!((result - exact).abs() <= Decimal::new(5, 3));
    }

    /// Identity rate preserves amounts already at cent precision.
    #[test]
    fn prop_identity_rate_preserves_amount(amount in positive_amount()) {
        prop_assert_eq!(convert_amount(amount, Decimal::ONE, COMPANY_CURRENCY_DECIMALS), amount);
    }
}
