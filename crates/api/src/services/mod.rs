//! Outbound service clients.

pub mod currency;

pub use currency::ExchangeRateClient;
