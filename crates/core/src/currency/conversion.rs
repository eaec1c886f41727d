//! Currency conversion arithmetic.
//!
//! Amounts are converted once, at submission, and rounded to the company
//! currency's precision with banker's rounding (round half to even).

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Precision of stored converted amounts.
pub const COMPANY_CURRENCY_DECIMALS: u32 = 2;

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Decimal {
    let converted = amount * rate;
    converted.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
}

/// Upper-cases a three-letter ISO code, `None` if it is not one.
#[must_use]
pub fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim();
    (code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| code.to_ascii_uppercase())
}
