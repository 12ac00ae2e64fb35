// Aggregator adapters (C1): three DEX quote APIs normalized into one
// `SwapQuote` shape behind a single `async_trait`, the same
// trait-per-collaborator convention the teacher uses for
// `MarketDataCollector` implementations (coinbase/kraken/binance_us).
mod oneinch;
mod paraswap;
mod zeroex;

pub use oneinch::OneInchAdapter;
pub use paraswap::ParaswapAdapter;
pub use zeroex::ZeroExAdapter;

use async_trait::async_trait;
use dustzap_common::{AdapterErrorKind, QuoteRequest, SwapQuote};

#[derive(Debug, Clone)]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub message: String,
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.wire_code(), self.message)
    }
}

impl std::error::Error for AdapterError {}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Classifies a transport-level failure (no response received at all).
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() || err.is_connect() {
            AdapterErrorKind::NetworkError
        } else {
            AdapterErrorKind::Unknown
        };
        Self::new(kind, err.to_string())
    }
}

#[async_trait]
pub trait QuoteAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// `getSwapData(req) -> SwapQuote | fail` (spec.md §4.1). Implementors
    /// are responsible for their own retry wrapping via
    /// `dustzap_common::retry::RetryPolicy`.
    async fn get_swap_data(&self, req: &QuoteRequest) -> Result<SwapQuote, AdapterError>;
}

/// Chain id -> Paraswap Augustus proxy address table, bit-exact per
/// spec.md §6.
pub fn paraswap_proxy_address(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 | 10 | 56 | 137 | 1101 | 43114 => Some("0x216b4b4ba9f3e719726886d34a177484278bfcae"),
        8453 => Some("0x93aAAe79a53759cD164340E4C8766E4Db5331cD7"),
        42161 => Some("0x216B4B4Ba9F3e719726886d34a177484278Bfcae"),
        _ => None,
    }
}

/// `gas * gasPrice * 10^-18 * ethPriceUSD` (spec.md §4.1). Display-only,
/// floating point is acceptable here.
pub fn gas_cost_usd(gas: u128, gas_price_wei: u128, eth_price_usd: f64) -> f64 {
    (gas as f64) * (gas_price_wei as f64) * 1e-18 * eth_price_usd
}

/// `toAmount * toTokenPriceUSD / 10^toTokenDecimals` (spec.md §4.1).
pub fn to_usd(to_amount: ethers_core::types::U256, to_token_price_usd: f64, to_token_decimals: u8) -> f64 {
    let human = u256_to_f64_scaled(to_amount, to_token_decimals);
    human * to_token_price_usd
}

/// Best-effort `U256 / 10^decimals` as `f64`, used only for USD display
/// math, never for wei-scale arithmetic.
pub fn u256_to_f64_scaled(amount: ethers_core::types::U256, decimals: u8) -> f64 {
    let divisor = 10f64.powi(decimals as i32);
    // U256 -> f64 via decimal string avoids silent truncation on large values.
    amount.to_string().parse::<f64>().unwrap_or(0.0) / divisor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_table_is_bit_exact() {
        assert_eq!(paraswap_proxy_address(1), Some("0x216b4b4ba9f3e719726886d34a177484278bfcae"));
        assert_eq!(paraswap_proxy_address(8453), Some("0x93aAAe79a53759cD164340E4C8766E4Db5331cD7"));
        assert_eq!(paraswap_proxy_address(42161), Some("0x216B4B4Ba9F3e719726886d34a177484278Bfcae"));
        assert_eq!(paraswap_proxy_address(999), None);
    }
}
