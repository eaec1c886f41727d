//! Conversion of expense amounts into the company currency.

pub mod conversion;
pub mod converter;

#[cfg(test)]
mod props;

pub use conversion::{COMPANY_CURRENCY_DECIMALS, convert_amount, normalize_code};
pub use converter::{CurrencyConverter, CurrencyError, StaticRates};
