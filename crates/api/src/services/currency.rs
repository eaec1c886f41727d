//! HTTP exchange-rate client.
//!
//! Fetches `GET {base}/{FROM}`, which answers `{"rates": {"EUR": 0.92, ...}}`,
//! and caches each table for the configured TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use claimflow_core::currency::{CurrencyConverter, CurrencyError, normalize_code};

type RateTable = Arc<HashMap<String, Decimal>>;

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, Decimal>,
}

/// Exchange-rate provider backed by an HTTP API.
#[derive(Clone)]
pub struct ExchangeRateClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    tables: Cache<String, RateTable>,
}

impl ExchangeRateClient {
    /// Creates a client for the given base URL.
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration, cache_ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            tables: Cache::builder()
                .max_capacity(256)
                .time_to_live(cache_ttl)
                .build(),
        }
    }

    async fn table(&self, base: &str) -> Result<RateTable, CurrencyError> {
        self.tables
            .try_get_with(base.to_string(), self.fetch(base))
            .await
            .map_err(|e| (*e).clone())
    }

    async fn fetch(&self, base: &str) -> Result<RateTable, CurrencyError> {
        let url = format!("{}/{base}", self.base_url);
        debug!(url = %url, "Fetching exchange rates");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Exchange rate request failed");
                CurrencyError::Provider(e.to_string())
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CurrencyError::UnsupportedCurrency(base.to_string()));
        }
        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "Exchange rate provider error");
            return Err(CurrencyError::Provider(format!("HTTP {}", response.status())));
        }

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| CurrencyError::Provider(e.to_string()))?;
        Ok(Arc::new(body.rates))
    }
}

#[async_trait]
impl CurrencyConverter for ExchangeRateClient {
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal, CurrencyError> {
        let from = normalize_code(from)
            .ok_or_else(|| CurrencyError::UnsupportedCurrency(from.to_string()))?;
        let to =
            normalize_code(to).ok_or_else(|| CurrencyError::UnsupportedCurrency(to.to_string()))?;
        if from == to {
            return Ok(Decimal::ONE);
        }

        let table = self.table(&from).await?;
        table
            .get(&to)
            .copied()
            .ok_or(CurrencyError::RateUnavailable { from, to })
    }
}
