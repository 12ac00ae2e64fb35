// Intent Handler (C9): orchestrates a dust-zap request end to end —
// validates the envelope, fills in dust tokens and the target-token
// price, assigns an intent id, and persists the execution context.
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dustzap_common::{ExecutionContext, GatewayConfig, GatewayError, IntentId, Token, ToToken};
use rand::Rng;

use crate::collaborators::{BalanceService, PriceService};
use crate::context_store::{ContextStore, PutError};

pub struct DustTokenInput {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub raw_amount_hex: String,
    pub price_usd: f64,
}

/// Raw client-submitted `dustZap` params (spec.md §4.9), pre-validation.
pub struct DustZapParams {
    pub to_token_address: String,
    pub to_token_decimals: u8,
    pub slippage: Option<f64>,
    pub referral_address: Option<String>,
    pub target_token: Option<String>,
    pub dust_tokens: Option<Vec<DustTokenInput>>,
}

pub struct IntentRequest {
    pub user_address: String,
    pub chain_id: i64,
    pub params: DustZapParams,
}

pub struct IntentOutcome {
    pub intent_id: IntentId,
    pub stream_url: String,
    pub estimated_duration_ms: u64,
    pub total_tokens: usize,
}

pub struct IntentHandler {
    config: GatewayConfig,
    context_store: Arc<ContextStore>,
    balance_service: Arc<dyn BalanceService>,
    price_service: Arc<dyn PriceService>,
}

impl IntentHandler {
    pub fn new(
        config: GatewayConfig,
        context_store: Arc<ContextStore>,
        balance_service: Arc<dyn BalanceService>,
        price_service: Arc<dyn PriceService>,
    ) -> Self {
        Self { config, context_store, balance_service, price_service }
    }

    /// `execute(request) -> {intentId, streamUrl, metadata}` (spec.md §4.9).
    pub async fn execute(&self, request: IntentRequest) -> Result<IntentOutcome, GatewayError> {
        validate_user_address(&request.user_address)?;
        if request.chain_id <= 0 {
            return Err(GatewayError::Validation("chainId must be a positive integer".to_string()));
        }
        let chain_id = request.chain_id as u64;

        validate_address(&request.params.to_token_address, "params.toTokenAddress")?;
        if !(1..=18).contains(&request.params.to_token_decimals) {
            return Err(GatewayError::Validation(
                "params.toTokenDecimals must be in [1, 18]".to_string(),
            ));
        }
        let slippage_pct = match request.params.slippage {
            Some(s) if !(0.0..=100.0).contains(&s) => {
                return Err(GatewayError::Validation("params.slippage must be in [0, 100]".to_string()));
            }
            Some(s) => s,
            None => 1.0,
        };
        if let Some(referral) = &request.params.referral_address {
            validate_address(referral, "params.referralAddress")?;
        }
        if let Some(target) = &request.params.target_token {
            if !self.config.allowed_target_tokens.iter().any(|t| t == target) {
                return Err(GatewayError::Validation(format!(
                    "params.targetToken {target} is not in the configured allow-list"
                )));
            }
        }
        if let Some(dust_tokens) = &request.params.dust_tokens {
            if dust_tokens.is_empty() {
                return Err(GatewayError::Validation(
                    "params.dustTokens must be non-empty when supplied".to_string(),
                ));
            }
        }

        let dust_tokens = match request.params.dust_tokens {
            Some(supplied) => supplied
                .into_iter()
                .map(|t| {
                    // Supplied dust tokens carry no separate `humanAmount`
                    // field (spec.md §4.9); reconstruct it from the raw
                    // amount so trading-loss/fee math has a nonzero input.
                    // An unparseable `rawAmountHex` is left at 0.0 here —
                    // the token processor re-parses it and emits the typed
                    // VALIDATION_ERROR failure for that token.
                    let human_amount = parse_hex_amount(&t.raw_amount_hex)
                        .map(|raw| dustzap_common::wei::raw_to_human(raw, t.decimals))
                        .unwrap_or(0.0);
                    Token {
                        address: t.address,
                        symbol: t.symbol,
                        decimals: t.decimals,
                        price_usd: t.price_usd,
                        human_amount,
                        raw_amount_hex: t.raw_amount_hex,
                    }
                })
                .collect(),
            None => self.discover_dust(&request.user_address, chain_id, &request.params.to_token_address).await?,
        };
        if dust_tokens.is_empty() {
            return Err(GatewayError::NoDustTokens);
        }

        let target_symbol = request.params.target_token.clone().unwrap_or_else(|| "ETH".to_string());
        let to_token_price_usd = self
            .price_service
            .get_price(&target_symbol)
            .await
            .map_err(|e| GatewayError::PriceFetchFailed(e.to_string()))?;
        // Gas is always denominated in the chain's native coin regardless of
        // the zap target; reuse the fetch above when the target already is it.
        let eth_price_usd = if target_symbol == "ETH" {
            to_token_price_usd
        } else {
            self.price_service
                .get_price("ETH")
                .await
                .map_err(|e| GatewayError::PriceFetchFailed(e.to_string()))?
        };

        let created_at_ms = current_unix_millis();
        let intent_id = IntentId::new("dust_zap", created_at_ms, &request.user_address, &random_hex(16));

        let total_tokens = dust_tokens.len();
        let context = ExecutionContext {
            intent_id: intent_id.clone(),
            user_address: request.user_address,
            chain_id,
            dust_tokens,
            eth_price_usd,
            to_token: ToToken {
                address: request.params.to_token_address,
                decimals: request.params.to_token_decimals,
                price_usd: to_token_price_usd,
            },
            slippage_pct,
            referral_address: request.params.referral_address,
            created_at_ms,
        };

        self.context_store.put(context).await.map_err(|e| match e {
            PutError::Full => GatewayError::ContextStoreFull,
        })?;

        Ok(IntentOutcome {
            stream_url: format!("/intents/{intent_id}/stream"),
            intent_id,
            estimated_duration_ms: total_tokens as u64 * 2_000,
            total_tokens,
        })
    }

    async fn discover_dust(
        &self,
        user_address: &str,
        chain_id: u64,
        to_token_address: &str,
    ) -> Result<Vec<Token>, GatewayError> {
        let balances = self
            .balance_service
            .get_balances(user_address, chain_id)
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(balances
            .into_iter()
            .filter(|t| !t.address.eq_ignore_ascii_case(to_token_address))
            .filter(|t| t.price_usd > 0.0)
            .filter(|t| t.input_usd() >= self.config.dust_threshold_usd)
            .collect())
    }
}

fn validate_user_address(address: &str) -> Result<(), GatewayError> {
    validate_address(address, "userAddress")
}

fn validate_address(address: &str, field: &str) -> Result<(), GatewayError> {
    let hex_part = address.strip_prefix("0x").ok_or_else(|| {
        GatewayError::Validation(format!("{field} must match ^0x[a-fA-F0-9]{{40}}$"))
    })?;
    if hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(GatewayError::Validation(format!("{field} must match ^0x[a-fA-F0-9]{{40}}$")))
    }
}

/// Parses a `^0x?[0-9a-fA-F]+$` hex amount (spec.md §3), mirroring
/// `Token::parse_raw_amount` without requiring a full `Token` to call it on.
fn parse_hex_amount(raw_amount_hex: &str) -> Option<ethers_core::types::U256> {
    let trimmed = raw_amount_hex.strip_prefix("0x").unwrap_or(raw_amount_hex);
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    ethers_core::types::U256::from_str_radix(trimmed, 16).ok()
}

fn current_unix_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

fn random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap()).collect()
}
