// Token Processor (C6): validates one dust token, fetches a quote via the
// selector (C2), appends its transactions via the builder (C4), and
// produces a typed outcome. A single token failure never aborts the batch
// (spec.md §4.6).
use dustzap_common::{AdapterErrorKind, ExecutionContext, QuoteRequest, Token, TokenOutcome, TradingLoss};

use crate::selector::QuoteSelector;
use crate::tx_builder::TransactionBuilder;

pub struct TokenProcessor<'a> {
    selector: &'a QuoteSelector,
}

impl<'a> TokenProcessor<'a> {
    pub fn new(selector: &'a QuoteSelector) -> Self {
        Self { selector }
    }

    /// Runs one dust token through validation, quoting, and calldata
    /// construction, appending generated transactions to `builder`.
    pub async fn process(
        &self,
        token: &Token,
        context: &ExecutionContext,
        builder: &mut TransactionBuilder,
    ) -> TokenOutcome {
        let input_usd = token.input_usd();

        let raw_amount = match token.parse_raw_amount() {
            Some(amount) => amount,
            None => {
                return Self::validation_failure(token, input_usd);
            }
        };

        let request = QuoteRequest {
            chain_id: context.chain_id,
            from_token_address: token.address.clone(),
            from_token_decimals: token.decimals,
            to_token_address: context.to_token.address.clone(),
            to_token_decimals: context.to_token.decimals,
            amount: raw_amount,
            from_address: context.user_address.clone(),
            slippage_pct: context.slippage_pct,
            eth_price_usd: context.eth_price_usd,
            to_token_price_usd: context.to_token.price_usd,
        };

        match self.selector.get_best(&request).await {
            Ok(quote) => {
                let approve_index =
                    builder.add_approve(&token.address, &quote.approve_to, raw_amount);
                let swap_index =
                    builder.add_swap(&quote, format!("zap {} via {}", token.symbol, quote.provider));

                // outputUSD is gross of gas; netLossUSD/lossPct compare
                // input against toUSD alone (spec.md §4.6).
                let output_usd = quote.to_usd + quote.gas_cost_usd;
                let net_loss_usd = input_usd - quote.to_usd;
                let loss_pct = if input_usd > 0.0 { net_loss_usd / input_usd * 100.0 } else { 0.0 };

                TokenOutcome::Success {
                    quote,
                    approve_index,
                    swap_index,
                    trading_loss: TradingLoss { input_usd, output_usd, net_loss_usd, loss_pct },
                }
            }
            Err(selector_error) => {
                let trading_loss = Self::fallback_loss(input_usd);
                TokenOutcome::Failure {
                    kind: selector_error.kind,
                    message: selector_error.to_string(),
                    user_message: Self::user_message(selector_error.kind),
                    trading_loss,
                    provider: None,
                }
            }
        }
    }

    fn validation_failure(token: &Token, input_usd: f64) -> TokenOutcome {
        TokenOutcome::Failure {
            kind: AdapterErrorKind::Validation,
            message: format!("invalid rawAmountHex for {}", token.symbol),
            user_message: "This token's balance could not be read and was skipped.".to_string(),
            trading_loss: Self::fallback_loss(input_usd),
            provider: None,
        }
    }

    fn fallback_loss(input_usd: f64) -> TradingLoss {
        TradingLoss {
            input_usd,
            output_usd: 0.0,
            net_loss_usd: input_usd,
            loss_pct: if input_usd > 0.0 { 100.0 } else { 0.0 },
        }
    }

    fn user_message(kind: AdapterErrorKind) -> String {
        match kind {
            AdapterErrorKind::NoLiquidity => "No liquidity was available for this token right now.".to_string(),
            AdapterErrorKind::UnsupportedToken => "This token isn't supported by any connected exchange.".to_string(),
            AdapterErrorKind::RateLimited => "The exchange is temporarily rate limiting requests; try again shortly.".to_string(),
            AdapterErrorKind::NetworkError => "A network error prevented fetching a quote.".to_string(),
            AdapterErrorKind::UpstreamError => "The exchange returned an unexpected error.".to_string(),
            AdapterErrorKind::Unknown => "This token could not be processed.".to_string(),
            AdapterErrorKind::Validation => "This token's balance could not be read and was skipped.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{AdapterError, QuoteAdapter};
    use async_trait::async_trait;
    use dustzap_common::{SwapQuote, ToToken};
    use ethers_core::types::U256;

    struct FakeAdapter {
        result: Result<SwapQuote, AdapterError>,
    }

    #[async_trait]
    impl QuoteAdapter for FakeAdapter {
        fn name(&self) -> &'static str {
            "fake"
        }
        async fn get_swap_data(&self, _req: &QuoteRequest) -> Result<SwapQuote, AdapterError> {
            self.result.clone()
        }
    }

    fn context() -> ExecutionContext {
        ExecutionContext {
            intent_id: dustzap_common::IntentId::new("dust_zap", 0, "0xuser", "abc123"),
            user_address: "0xuser".to_string(),
            chain_id: 1,
            dust_tokens: vec![],
            eth_price_usd: 3000.0,
            to_token: ToToken { address: "0xusdc".to_string(), decimals: 6, price_usd: 1.0 },
            slippage_pct: 1.0,
            referral_address: None,
            created_at_ms: 0,
        }
    }

    fn token(raw_amount_hex: &str) -> Token {
        Token {
            address: "0xdust".to_string(),
            symbol: "DUST".to_string(),
            decimals: 18,
            price_usd: 0.5,
            human_amount: 10.0,
            raw_amount_hex: raw_amount_hex.to_string(),
        }
    }

    #[tokio::test]
    async fn invalid_raw_amount_emits_validation_failure() {
        let adapter = FakeAdapter { result: Ok(quote()) };
        let selector = QuoteSelector::new(vec![Box::new(adapter)]);
        let processor = TokenProcessor::new(&selector);
        let mut builder = TransactionBuilder::new();

        let outcome = processor.process(&token("0xZZ"), &context(), &mut builder).await;
        match outcome {
            TokenOutcome::Failure { kind, trading_loss, .. } => {
                assert_eq!(kind, AdapterErrorKind::Validation);
                assert_eq!(trading_loss.net_loss_usd, 5.0);
                assert_eq!(trading_loss.loss_pct, 100.0);
            }
            TokenOutcome::Success { .. } => panic!("expected failure"),
        }
        assert!(builder.get_transactions().is_empty());
    }

    #[tokio::test]
    async fn success_appends_approve_and_swap() {
        let adapter = FakeAdapter { result: Ok(quote()) };
        let selector = QuoteSelector::new(vec![Box::new(adapter)]);
        let processor = TokenProcessor::new(&selector);
        let mut builder = TransactionBuilder::new();

        let outcome = processor.process(&token("0x64"), &context(), &mut builder).await;
        match outcome {
            TokenOutcome::Success { approve_index, swap_index, .. } => {
                assert_eq!(approve_index, 0);
                assert_eq!(swap_index, 1);
                assert_eq!(builder.get_transactions().len(), 2);
            }
            TokenOutcome::Failure { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn failure_isolation_leaves_builder_untouched() {
        let adapter = FakeAdapter {
            result: Err(AdapterError::new(AdapterErrorKind::NoLiquidity, "no route")),
        };
        let selector = QuoteSelector::new(vec![Box::new(adapter)]);
        let processor = TokenProcessor::new(&selector);
        let mut builder = TransactionBuilder::new();

        let outcome = processor.process(&token("0x64"), &context(), &mut builder).await;
        assert!(matches!(outcome, TokenOutcome::Failure { kind: AdapterErrorKind::NoLiquidity, .. }));
        assert!(builder.get_transactions().is_empty());
    }

    fn quote() -> SwapQuote {
        SwapQuote {
            provider: "1inch".to_string(),
            to: "0xrouter".to_string(),
            approve_to: "0xrouter".to_string(),
            to_amount: U256::from(1_000u64),
            min_to_amount: U256::from(990u64),
            data: "0xdeadbeef".to_string(),
            gas: U256::from(100_000u64),
            gas_cost_usd: 0.0,
            to_usd: 5.0,
            custom_slippage: None,
        }
    }
}
