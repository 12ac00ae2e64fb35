// 1inch adapter (spec.md §4.1): chain-prefixed excluded protocols,
// `approveTo = to = tx.to`, bearer auth.
use async_trait::async_trait;
use dustzap_common::retry::RetryPolicy;
use dustzap_common::{AdapterErrorKind, QuoteRequest, SwapQuote};
use ethers_core::types::U256;
use serde::Deserialize;
use tracing::instrument;

use super::{gas_cost_usd, to_usd, AdapterError, QuoteAdapter};

const BASE_URL: &str = "https://api.1inch.dev/swap/v6.0";

pub struct OneInchAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    retry: RetryPolicy,
    base_url: String,
}

impl OneInchAdapter {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key, retry: RetryPolicy::adapter_default(), base_url: BASE_URL.to_string() }
    }

    #[cfg(test)]
    fn with_base_url(client: reqwest::Client, base_url: String, retry: RetryPolicy) -> Self {
        Self { client, api_key: None, retry, base_url }
    }

    /// 1inch excludes its own limit-order protocol per chain, e.g.
    /// `ARBITRUM_ONE_INCH_LIMIT_ORDER_V3` / `V4` (spec.md §4.1).
    fn excluded_protocols(chain_id: u64) -> &'static str {
        match chain_id {
            42161 => "ARBITRUM_ONE_INCH_LIMIT_ORDER_V3,ARBITRUM_ONE_INCH_LIMIT_ORDER_V4",
            137 => "POLYGON_ONE_INCH_LIMIT_ORDER_V3,POLYGON_ONE_INCH_LIMIT_ORDER_V4",
            8453 => "BASE_ONE_INCH_LIMIT_ORDER_V3,BASE_ONE_INCH_LIMIT_ORDER_V4",
            _ => "MAINNET_ONE_INCH_LIMIT_ORDER_V3,MAINNET_ONE_INCH_LIMIT_ORDER_V4",
        }
    }

    async fn call_once(&self, req: &QuoteRequest) -> Result<OneInchSwapResponse, AdapterError> {
        let url = format!("{}/{}/swap", self.base_url, req.chain_id);
        let mut builder = self
            .client
            .get(&url)
            .query(&[
                ("src", req.from_token_address.as_str()),
                ("dst", req.to_token_address.as_str()),
                ("amount", &req.amount.to_string()),
                ("from", req.from_address.as_str()),
                ("slippage", &req.slippage_pct.to_string()),
                ("excludedProtocols", Self::excluded_protocols(req.chain_id)),
            ]);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(|e| AdapterError::from_transport(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| AdapterError::from_transport(&e))?;
        if !status.is_success() {
            let kind = AdapterErrorKind::classify(Some(status.as_u16()), &body);
            return Err(AdapterError::new(kind, format!("1inch HTTP {status}: {body}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| AdapterError::new(AdapterErrorKind::Unknown, format!("1inch decode error: {e}")))
    }
}

#[async_trait]
impl QuoteAdapter for OneInchAdapter {
    fn name(&self) -> &'static str {
        "1inch"
    }

    #[instrument(skip(self, req), fields(provider = "1inch", chain_id = req.chain_id))]
    async fn get_swap_data(&self, req: &QuoteRequest) -> Result<SwapQuote, AdapterError> {
        let response = self
            .retry
            .execute("1inch", || self.call_once(req), |e| e.kind)
            .await?;

        let to_amount = U256::from_dec_str(&response.to_amount)
            .map_err(|e| AdapterError::new(AdapterErrorKind::Unknown, format!("bad toAmount: {e}")))?;
        let min_to_amount = dustzap_common::wei::min_to_amount(to_amount, req.slippage_pct);
        let gas = U256::from_dec_str(&response.tx.gas).unwrap_or_else(|_| U256::from(250_000u64));
        let gas_price = U256::from_dec_str(&response.tx.gas_price).unwrap_or_default();
        let gas_cost = gas_cost_usd(gas.as_u128(), gas_price.as_u128(), req.eth_price_usd);
        let quote_to_usd = to_usd(to_amount, req.to_token_price_usd, req.to_token_decimals);

        Ok(SwapQuote {
            provider: self.name().to_string(),
            to: response.tx.to.clone(),
            approve_to: response.tx.to,
            to_amount,
            min_to_amount,
            data: response.tx.data,
            gas,
            gas_cost_usd: gas_cost,
            // 1inch's `toAmount` is gross of gas; the selector normalizes on `toUSD - gasCostUSD`.
            to_usd: quote_to_usd,
            custom_slippage: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OneInchSwapResponse {
    #[serde(rename = "toAmount")]
    to_amount: String,
    tx: OneInchTx,
}

#[derive(Debug, Deserialize)]
struct OneInchTx {
    to: String,
    data: String,
    gas: String,
    #[serde(rename = "gasPrice")]
    gas_price: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustzap_common::QuoteRequest;

    fn request() -> QuoteRequest {
        QuoteRequest {
            chain_id: 1,
            from_token_address: "0xaaa".to_string(),
            from_token_decimals: 18,
            to_token_address: "0xeth".to_string(),
            to_token_decimals: 18,
            amount: U256::from(1_000_000u64),
            from_address: "0x1111111111111111111111111111111111111111".to_string(),
            slippage_pct: 1.0,
            eth_price_usd: 3000.0,
            to_token_price_usd: 3000.0,
        }
    }

    #[test]
    fn excluded_protocols_are_chain_specific() {
        assert!(OneInchAdapter::excluded_protocols(42161).contains("ARBITRUM"));
        assert!(OneInchAdapter::excluded_protocols(1).contains("MAINNET"));
    }

    #[tokio::test]
    async fn parses_a_successful_quote_response() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/1/swap"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "toAmount": "6000000000000",
                "tx": {
                    "to": "0xrouter",
                    "data": "0xdeadbeef",
                    "gas": "100000",
                    "gasPrice": "20000000000",
                }
            })))
            .mount(&server)
            .await;

        let adapter =
            OneInchAdapter::with_base_url(reqwest::Client::new(), server.uri(), RetryPolicy::adapter_default());
        let response = adapter.call_once(&request()).await.unwrap();
        assert_eq!(response.to_amount, "6000000000000");
        assert_eq!(response.tx.to, "0xrouter");
    }

    #[tokio::test]
    async fn classifies_rate_limit_responses() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
            .mount(&server)
            .await;

        let adapter = OneInchAdapter::with_base_url(
            reqwest::Client::new(),
            server.uri(),
            RetryPolicy { max_attempts: 1, ..RetryPolicy::adapter_default() },
        );
        let err = adapter.call_once(&request()).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::RateLimited);
    }
}
