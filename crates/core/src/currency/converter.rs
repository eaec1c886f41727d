//! Exchange-rate collaborator contract.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::currency::conversion::{COMPANY_CURRENCY_DECIMALS, convert_amount};

/// Errors raised while converting amounts.
#[derive(Debug, Clone, Error)]
pub enum CurrencyError {
    /// The provider does not know the currency.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// No rate between the two currencies.
    #[error("No exchange rate from {from} to {to}")]
    RateUnavailable {
        /// Source currency.
        from: String,
        /// Target currency.
        to: String,
    },

    /// The provider could not be reached or answered garbage.
    #[error("Exchange rate provider error: {0}")]
    Provider(String),
}

/// Source of exchange rates.
#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    /// Rate such that `1 from = rate to`.
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal, CurrencyError>;

    /// Converts `amount` from `from` into `to`, rounded to company precision.
    ///
    /// Same-currency conversions never consult the provider.
    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, CurrencyError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(convert_amount(amount, Decimal::ONE, COMPANY_CURRENCY_DECIMALS));
        }
        let rate = self.rate(from, to).await?;
        Ok(convert_amount(amount, rate, COMPANY_CURRENCY_DECIMALS))
    }
}

/// Fixed rate table, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticRates {
    rates: HashMap<(String, String), Decimal>,
}

impl StaticRates {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rate `1 from = rate to`.
    #[must_use]
    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates
            .insert((from.to_ascii_uppercase(), to.to_ascii_uppercase()), rate);
        self
    }
}

#[async_trait]
impl CurrencyConverter for StaticRates {
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal, CurrencyError> {
        self.rates
            .get(&(from.to_ascii_uppercase(), to.to_ascii_uppercase()))
            .copied()
            .ok_or_else(|| CurrencyError::RateUnavailable {
                from: from.to_string(),
                to: to.to_string(),
            })
    }
}
