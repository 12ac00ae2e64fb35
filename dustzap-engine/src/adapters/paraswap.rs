// Paraswap adapter (spec.md §4.1): chain-id -> proxy-address mapping for
// `approveTo`, `side=SELL`, excludes `AugustusRFQ`, `gasCostUSD` taken
// directly from the response.
use async_trait::async_trait;
use dustzap_common::retry::RetryPolicy;
use dustzap_common::{AdapterErrorKind, QuoteRequest, SwapQuote};
use ethers_core::types::U256;
use serde::Deserialize;
use tracing::instrument;

use super::{paraswap_proxy_address, to_usd, AdapterError, QuoteAdapter};

const BASE_URL: &str = "https://apiv5.paraswap.io";

pub struct ParaswapAdapter {
    client: reqwest::Client,
    partner: String,
    retry: RetryPolicy,
    base_url: String,
}

impl ParaswapAdapter {
    pub fn new(client: reqwest::Client, partner: Option<String>) -> Self {
        Self {
            client,
            partner: partner.unwrap_or_else(|| "dustzap".to_string()),
            retry: RetryPolicy::adapter_default(),
            base_url: BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(client: reqwest::Client, base_url: String, retry: RetryPolicy) -> Self {
        Self { client, partner: "dustzap".to_string(), retry, base_url }
    }

    async fn price(&self, req: &QuoteRequest) -> Result<ParaswapPriceResponse, AdapterError> {
        let url = format!("{}/prices", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("srcToken", req.from_token_address.as_str()),
                ("destToken", req.to_token_address.as_str()),
                ("srcDecimals", &req.from_token_decimals.to_string()),
                ("destDecimals", &req.to_token_decimals.to_string()),
                ("amount", &req.amount.to_string()),
                ("side", "SELL"),
                ("network", &req.chain_id.to_string()),
                ("excludeDEXS", "AugustusRFQ"),
                ("partner", &self.partner),
            ])
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(&e))?;
        self.parse(response).await
    }

    async fn build_transaction(
        &self,
        req: &QuoteRequest,
        price: &ParaswapPriceResponse,
    ) -> Result<ParaswapTransactionResponse, AdapterError> {
        if paraswap_proxy_address(req.chain_id).is_none() {
            return Err(AdapterError::new(AdapterErrorKind::UnsupportedToken, "unsupported chain for paraswap"));
        }
        let url = format!("{}/transactions/{}", self.base_url, req.chain_id);
        let body = serde_json::json!({
            "srcToken": req.from_token_address,
            "destToken": req.to_token_address,
            "srcAmount": req.amount.to_string(),
            "destAmount": price.price_route.dest_amount,
            "priceRoute": price.price_route.raw,
            "userAddress": req.from_address,
            "partner": self.partner,
            "srcDecimals": req.from_token_decimals,
            "destDecimals": req.to_token_decimals,
        });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::from_transport(&e))?;
        let tx: ParaswapTransactionResponse = self.parse(response).await?;
        Ok(tx)
    }

    async fn parse<T: serde::de::DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, AdapterError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| AdapterError::from_transport(&e))?;
        if !status.is_success() {
            let kind = AdapterErrorKind::classify(Some(status.as_u16()), &body);
            return Err(AdapterError::new(kind, format!("paraswap HTTP {status}: {body}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| AdapterError::new(AdapterErrorKind::Unknown, format!("paraswap decode error: {e}")))
    }
}

#[async_trait]
impl QuoteAdapter for ParaswapAdapter {
    fn name(&self) -> &'static str {
        "paraswap"
    }

    #[instrument(skip(self, req), fields(provider = "paraswap", chain_id = req.chain_id))]
    async fn get_swap_data(&self, req: &QuoteRequest) -> Result<SwapQuote, AdapterError> {
        let price = self.retry.execute("paraswap", || self.price(req), |e| e.kind).await?;
        let tx = self
            .retry
            .execute("paraswap", || self.build_transaction(req, &price), |e| e.kind)
            .await?;

        let to_amount = U256::from_dec_str(&price.price_route.dest_amount)
            .map_err(|e| AdapterError::new(AdapterErrorKind::Unknown, format!("bad destAmount: {e}")))?;
        let min_to_amount = dustzap_common::wei::min_to_amount(to_amount, req.slippage_pct);
        let approve_to = paraswap_proxy_address(req.chain_id)
            .ok_or_else(|| AdapterError::new(AdapterErrorKind::UnsupportedToken, "unsupported chain"))?
            .to_string();
        let quote_to_usd = to_usd(to_amount, req.to_token_price_usd, req.to_token_decimals);

        Ok(SwapQuote {
            provider: self.name().to_string(),
            to: tx.to,
            approve_to,
            to_amount,
            min_to_amount,
            data: tx.data,
            gas: U256::from_dec_str(&tx.gas).unwrap_or_else(|_| U256::from(300_000u64)),
            // Paraswap returns gasCostUSD directly (spec.md §4.1).
            gas_cost_usd: price.price_route.gas_cost_usd,
            to_usd: quote_to_usd,
            custom_slippage: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ParaswapPriceResponse {
    #[serde(rename = "priceRoute")]
    price_route: ParaswapPriceRoute,
}

#[derive(Debug, Deserialize)]
struct ParaswapPriceRoute {
    #[serde(rename = "destAmount")]
    dest_amount: String,
    #[serde(rename = "gasCostUSD", default, deserialize_with = "parse_f64_str")]
    gas_cost_usd: f64,
    #[serde(flatten)]
    raw: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ParaswapTransactionResponse {
    to: String,
    data: String,
    gas: String,
}

fn parse_f64_str<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<f64>().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(chain_id: u64) -> QuoteRequest {
        QuoteRequest {
            chain_id,
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
    async fn full_round_trip_builds_a_quote() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/prices"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "priceRoute": {
                    "destAmount": "6000000000000",
                    "gasCostUSD": "0.0001",
                }
            })))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/transactions/1"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "to": "0xaugustus",
                "data": "0xdeadbeef",
                "gas": "180000",
            })))
            .mount(&server)
            .await;

        let adapter =
            ParaswapAdapter::with_base_url(reqwest::Client::new(), server.uri(), RetryPolicy::adapter_default());
        let quote = adapter.get_swap_data(&request(1)).await.unwrap();
        assert_eq!(quote.provider, "paraswap");
        assert_eq!(quote.to_amount, U256::from(6_000_000_000_000u64));
        assert_eq!(quote.approve_to, "0x216b4b4ba9f3e719726886d34a177484278bfcae");
        assert_eq!(quote.gas_cost_usd, 0.0001);
    }

    #[tokio::test]
    async fn unsupported_chain_fails_before_any_transaction_call() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/prices"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "priceRoute": { "destAmount": "100", "gasCostUSD": "0.0" }
            })))
            .mount(&server)
            .await;

        let adapter =
            ParaswapAdapter::with_base_url(reqwest::Client::new(), server.uri(), RetryPolicy::adapter_default());
        let err = adapter.get_swap_data(&request(999_999)).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::UnsupportedToken);
    }
}
