// 0x adapter (spec.md §4.1): a `liquidityAvailable=false` response is a
// NO_LIQUIDITY failure, not a transport error, and must be surfaced with
// that classification even though the HTTP call itself succeeded.
use async_trait::async_trait;
use dustzap_common::retry::RetryPolicy;
use dustzap_common::{AdapterErrorKind, QuoteRequest, SwapQuote};
use ethers_core::types::U256;
use serde::Deserialize;
use tracing::instrument;

use super::{gas_cost_usd, to_usd, AdapterError, QuoteAdapter};

const BASE_URL: &str = "https://api.0x.org/swap/v1/quote";

pub struct ZeroExAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    retry: RetryPolicy,
    base_url: String,
}

impl ZeroExAdapter {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key, retry: RetryPolicy::adapter_default(), base_url: BASE_URL.to_string() }
    }

    #[cfg(test)]
    fn with_base_url(client: reqwest::Client, base_url: String, retry: RetryPolicy) -> Self {
        Self { client, api_key: None, retry, base_url }
    }

    async fn call_once(&self, req: &QuoteRequest) -> Result<ZeroExQuoteResponse, AdapterError> {
        let mut builder = self.client.get(&self.base_url).query(&[
            ("sellToken", req.from_token_address.as_str()),
            ("buyToken", req.to_token_address.as_str()),
            ("sellAmount", &req.amount.to_string()),
            ("takerAddress", req.from_address.as_str()),
            ("slippagePercentage", &(req.slippage_pct / 100.0).to_string()),
            ("chainId", &req.chain_id.to_string()),
        ]);
        if let Some(key) = &self.api_key {
            builder = builder.header("0x-api-key", key);
        }
        let response = builder.send().await.map_err(|e| AdapterError::from_transport(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| AdapterError::from_transport(&e))?;
        if !status.is_success() {
            let kind = AdapterErrorKind::classify(Some(status.as_u16()), &body);
            return Err(AdapterError::new(kind, format!("0x HTTP {status}: {body}")));
        }
        let parsed: ZeroExQuoteResponse = serde_json::from_str(&body)
            .map_err(|e| AdapterError::new(AdapterErrorKind::Unknown, format!("0x decode error: {e}")))?;
        if !parsed.liquidity_available {
            return Err(AdapterError::new(AdapterErrorKind::NoLiquidity, "0x: liquidityAvailable=false"));
        }
        Ok(parsed)
    }
}

#[async_trait]
impl QuoteAdapter for ZeroExAdapter {
    fn name(&self) -> &'static str {
        "0x"
    }

    #[instrument(skip(self, req), fields(provider = "0x", chain_id = req.chain_id))]
    async fn get_swap_data(&self, req: &QuoteRequest) -> Result<SwapQuote, AdapterError> {
        let response = self.retry.execute("0x", || self.call_once(req), |e| e.kind).await?;

        let to_amount = U256::from_dec_str(&response.buy_amount)
            .map_err(|e| AdapterError::new(AdapterErrorKind::Unknown, format!("bad buyAmount: {e}")))?;
        let min_to_amount = dustzap_common::wei::min_to_amount(to_amount, req.slippage_pct);
        let gas = U256::from_dec_str(&response.gas).unwrap_or_else(|_| U256::from(250_000u64));
        let gas_price = U256::from_dec_str(&response.gas_price).unwrap_or_default();
        let gas_cost = gas_cost_usd(gas.as_u128(), gas_price.as_u128(), req.eth_price_usd);
        let quote_to_usd = to_usd(to_amount, req.to_token_price_usd, req.to_token_decimals);

        Ok(SwapQuote {
            provider: self.name().to_string(),
            to: response.to.clone(),
            approve_to: response.allowance_target.unwrap_or(response.to),
            to_amount,
            min_to_amount,
            data: response.data,
            gas,
            gas_cost_usd: gas_cost,
            to_usd: quote_to_usd,
            custom_slippage: None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZeroExQuoteResponse {
    to: String,
    data: String,
    gas: String,
    #[serde(rename = "gasPrice")]
    gas_price: String,
    #[serde(rename = "buyAmount")]
    buy_amount: String,
    allowance_target: Option<String>,
    #[serde(default = "default_liquidity_available")]
    liquidity_available: bool,
}

fn default_liquidity_available() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[tokio::test]
    async fn parses_a_successful_quote_response() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "to": "0xrouter",
                "data": "0xdeadbeef",
                "gas": "100000",
                "gasPrice": "20000000000",
                "buyAmount": "6000000000000",
                "allowanceTarget": "0xallowance",
                "liquidityAvailable": true,
            })))
            .mount(&server)
            .await;

        let adapter =
            ZeroExAdapter::with_base_url(reqwest::Client::new(), server.uri(), RetryPolicy::adapter_default());
        let quote = adapter.get_swap_data(&request()).await.unwrap();
        assert_eq!(quote.provider, "0x");
        assert_eq!(quote.to_amount, U256::from(6_000_000_000_000u64));
        assert_eq!(quote.approve_to, "0xallowance");
    }

    #[tokio::test]
    async fn no_liquidity_is_classified_and_not_retried() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "to": "0xrouter",
                "data": "0x",
                "gas": "100000",
                "gasPrice": "20000000000",
                "buyAmount": "0",
                "liquidityAvailable": false,
            })))
            .mount(&server)
            .await;

        let adapter = ZeroExAdapter::with_base_url(
            reqwest::Client::new(),
            server.uri(),
            RetryPolicy { max_attempts: 1, ..RetryPolicy::adapter_default() },
        );
        let err = adapter.get_swap_data(&request()).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::NoLiquidity);
    }
}
