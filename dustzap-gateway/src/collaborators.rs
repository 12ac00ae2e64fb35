// External collaborators (spec.md §6, out of core scope but needed to
// drive C9): wallet-balance discovery and target-token price lookup.
// Modeled as `async_trait`s matching the teacher's `MarketDataCollector`
// convention so C9 stays unit-testable with fake implementations.
use async_trait::async_trait;
use dustzap_common::Token;

#[derive(Debug, Clone)]
pub struct BalanceServiceError(pub String);

impl std::fmt::Display for BalanceServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BalanceServiceError {}

#[async_trait]
pub trait BalanceService: Send + Sync {
    async fn get_balances(&self, address: &str, chain_id: u64) -> Result<Vec<Token>, BalanceServiceError>;
}

#[derive(Debug, Clone)]
pub struct PriceServiceError(pub String);

impl std::fmt::Display for PriceServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PriceServiceError {}

#[async_trait]
pub trait PriceService: Send + Sync {
    async fn get_price(&self, symbol: &str) -> Result<f64, PriceServiceError>;
}

/// `reqwest`-backed balance discovery against a configurable wallet-index
/// endpoint. Out of core scope per spec.md §1; kept minimal.
pub struct HttpBalanceService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBalanceService {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl BalanceService for HttpBalanceService {
    async fn get_balances(&self, address: &str, chain_id: u64) -> Result<Vec<Token>, BalanceServiceError> {
        let url = format!("{}/balances/{}/{}", self.base_url, chain_id, address);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BalanceServiceError(e.to_string()))?;
        response
            .json::<Vec<Token>>()
            .await
            .map_err(|e| BalanceServiceError(e.to_string()))
    }
}

/// `reqwest`-backed price lookup against a configurable price-feed
/// endpoint. Out of core scope per spec.md §1; kept minimal.
pub struct HttpPriceService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPriceService {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(serde::Deserialize)]
struct PriceResponse {
    price: f64,
}

#[async_trait]
impl PriceService for HttpPriceService {
    async fn get_price(&self, symbol: &str) -> Result<f64, PriceServiceError> {
        let url = format!("{}/price/{}", self.base_url, symbol);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceServiceError(e.to_string()))?;
        let parsed: PriceResponse =
            response.json().await.map_err(|e| PriceServiceError(e.to_string()))?;
        Ok(parsed.price)
    }
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use std::collections::HashMap;

    pub struct FakeBalanceService {
        pub balances: Vec<Token>,
    }

    #[async_trait]
    impl BalanceService for FakeBalanceService {
        async fn get_balances(&self, _address: &str, _chain_id: u64) -> Result<Vec<Token>, BalanceServiceError> {
            Ok(self.balances.clone())
        }
    }

    pub struct FakePriceService {
        pub prices: HashMap<String, f64>,
    }

    #[async_trait]
    impl PriceService for FakePriceService {
        async fn get_price(&self, symbol: &str) -> Result<f64, PriceServiceError> {
            self.prices
                .get(symbol)
                .copied()
                .ok_or_else(|| PriceServiceError(format!("no price for {symbol}")))
        }
    }
}
