// SSE Streaming Pipeline (C7): consumes an execution context exactly
// once, iterates tokens sequentially, and emits a `StreamEvent` per
// token plus a terminal `complete`/`error` event. Built the same way the
// teacher decouples metric production from websocket write-out: a
// background task drives the pipeline and writes into an `mpsc::Sender`,
// while the axum handler only wraps the paired receiver in an SSE body.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dustzap_common::{CompleteMetadata, ExecutionContext, MetricsCollector, StreamEvent, TokenOutcome};
use dustzap_engine::{FeeCalculator, TokenProcessor, TransactionBuilder};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

pub struct StreamDeps {
    pub token_processor_selector: Arc<dustzap_engine::QuoteSelector>,
    pub fee_calculator: Arc<FeeCalculator>,
    pub metrics: Arc<MetricsCollector>,
}

/// Millis elapsed since a per-stream `Instant` epoch, shared between
/// `run_pipeline` and `run_heartbeat` so the heartbeat can tell whether
/// anything has gone out on the channel recently (spec.md §4.7).
pub struct ActivityClock {
    epoch: Instant,
    last_activity_ms: AtomicU64,
}

impl ActivityClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { epoch: Instant::now(), last_activity_ms: AtomicU64::new(0) })
    }

    fn mark(&self) {
        self.last_activity_ms.store(self.epoch.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last = self.last_activity_ms.load(Ordering::Relaxed);
        self.epoch.elapsed().saturating_sub(Duration::from_millis(last))
    }
}

/// Drives the per-token pipeline for one consumed context, writing every
/// event into `tx`. Returns when the pipeline finishes or `cancel` fires.
#[instrument(skip(context, tx, deps, cancel, activity), fields(intent_id = %context.intent_id))]
pub async fn run_pipeline(
    context: ExecutionContext,
    tx: mpsc::Sender<StreamEvent>,
    deps: StreamDeps,
    cancel: CancellationToken,
    activity: Arc<ActivityClock>,
) {
    deps.metrics.record_stream_opened();

    if send(&tx, StreamEvent::Connected { intent_id: context.intent_id.to_string(), timestamp: Utc::now() }, &activity)
        .await
        .is_err()
    {
        deps.metrics.record_stream_closed("disconnected");
        return;
    }

    let processor = TokenProcessor::new(&deps.token_processor_selector);
    let mut builder = TransactionBuilder::new();
    let total_tokens = context.dust_tokens.len();
    let mut processed_tokens = 0usize;
    let mut total_value_usd = 0.0;

    for (index, token) in context.dust_tokens.iter().enumerate() {
        if cancel.is_cancelled() {
            info!("pipeline cancelled before token {index}, aborting");
            deps.metrics.record_stream_closed("cancelled");
            return;
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                deps.metrics.record_stream_closed("cancelled");
                return;
            }
            outcome = processor.process(token, &context, &mut builder) => outcome,
        };
        processed_tokens += 1;
        let progress = processed_tokens as f64 / total_tokens.max(1) as f64;

        let event = match &outcome {
            TokenOutcome::Success { quote, trading_loss, .. } => {
                deps.metrics.record_token_processed("success");
                total_value_usd += trading_loss.input_usd;
                StreamEvent::TokenReady {
                    token_index: index,
                    token_symbol: token.symbol.clone(),
                    token_address: token.address.clone(),
                    transactions: builder.get_transactions(),
                    provider: quote.provider.clone(),
                    expected_token_amount: quote.to_amount.to_string(),
                    min_to_amount: quote.min_to_amount.to_string(),
                    to_usd: quote.to_usd,
                    gas_cost_usd: quote.gas_cost_usd,
                    trading_loss: trading_loss.clone(),
                    progress,
                    processed_tokens,
                    total_tokens,
                    timestamp: Utc::now(),
                }
            }
            TokenOutcome::Failure { kind, message, user_message, trading_loss, provider } => {
                deps.metrics.record_token_processed("failure");
                total_value_usd += trading_loss.input_usd;
                StreamEvent::TokenFailed {
                    token_index: index,
                    token_symbol: token.symbol.clone(),
                    token_address: token.address.clone(),
                    error: message.clone(),
                    error_category: kind.wire_code().to_string(),
                    user_friendly_message: user_message.clone(),
                    provider: provider.clone().unwrap_or_else(|| "failed".to_string()),
                    trading_loss: trading_loss.clone(),
                    progress,
                    processed_tokens,
                    total_tokens,
                    timestamp: Utc::now(),
                }
            }
        };

        if send(&tx, event, &activity).await.is_err() {
            deps.metrics.record_stream_closed("disconnected");
            return;
        }
    }

    let outcome = deps
        .fee_calculator
        .compute(total_value_usd, context.eth_price_usd, context.referral_address.as_deref());
    for transfer in &outcome.transfers {
        builder.add_native_transfer(&transfer.to, transfer.amount_wei, "platform fee");
    }

    let complete = StreamEvent::Complete {
        transactions: builder.get_transactions(),
        metadata: CompleteMetadata {
            total_tokens,
            processed_tokens,
            total_value_usd,
            fee_info: outcome.info,
            estimated_total_gas: builder.get_total_gas(),
        },
        timestamp: Utc::now(),
    };
    let _ = send(&tx, complete, &activity).await;
    deps.metrics.record_stream_closed("completed");
}

/// Heartbeat, emitted only when no other event has gone out within
/// `interval` (spec.md §4.7). Polls `activity` on a quarter of the
/// heartbeat interval so a burst of token events defers it instead of
/// firing inside the same window. Runs alongside `run_pipeline` and
/// stops as soon as the channel closes or `cancel` fires.
pub async fn run_heartbeat(
    tx: mpsc::Sender<StreamEvent>,
    interval: Duration,
    cancel: CancellationToken,
    metrics: Arc<MetricsCollector>,
    activity: Arc<ActivityClock>,
) {
    let poll = (interval / 4).max(Duration::from_millis(50));
    let mut ticker = tokio::time::interval(poll);
    ticker.tick().await; // first tick fires immediately; skip it
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                if activity.idle_for() < interval {
                    continue;
                }
                if send(&tx, StreamEvent::Heartbeat { timestamp: Utc::now() }, &activity).await.is_err() {
                    return;
                }
                metrics.record_heartbeat_sent();
            }
        }
    }
}

async fn send(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent, activity: &ActivityClock) -> Result<(), ()> {
    tx.send(event).await.map_err(|_| ())?;
    activity.mark();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustzap_engine::adapters::{AdapterError, QuoteAdapter};
    use dustzap_engine::{FeeConfig, QuoteSelector};
    use async_trait::async_trait;
    use dustzap_common::{AdapterErrorKind, QuoteRequest, SwapQuote, ToToken, Token};
    use ethers_core::types::U256;

    struct AlwaysSucceeds;

    #[async_trait]
    impl QuoteAdapter for AlwaysSucceeds {
        fn name(&self) -> &'static str {
            "fake"
        }
        async fn get_swap_data(&self, _req: &QuoteRequest) -> Result<SwapQuote, AdapterError> {
            Ok(SwapQuote {
                provider: "fake".to_string(),
                to: "0xrouter".to_string(),
                approve_to: "0xrouter".to_string(),
                to_amount: U256::from(6_000_000_000_000u64),
                min_to_amount: U256::from(5_940_000_000_000u64),
                data: "0xdata".to_string(),
                gas: U256::from(100_000u64),
                gas_cost_usd: 0.0001,
                to_usd: 0.0179,
                custom_slippage: None,
            })
        }
    }

    fn context() -> ExecutionContext {
        ExecutionContext {
            intent_id: dustzap_common::IntentId::new("dust_zap", 0, "0x1111111111111111111111111111111111111111", "abc123"),
            user_address: "0x1111111111111111111111111111111111111111".to_string(),
            chain_id: 1,
            dust_tokens: vec![Token {
                address: "0xaaa".to_string(),
                symbol: "AAA".to_string(),
                decimals: 6,
                price_usd: 0.02,
                human_amount: 1.0,
                raw_amount_hex: "0xF4240".to_string(),
            }],
            eth_price_usd: 3000.0,
            to_token: ToToken { address: "0xeth".to_string(), decimals: 18, price_usd: 3000.0 },
            slippage_pct: 1.0,
            referral_address: None,
            created_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn s1_happy_path_single_token_produces_three_transactions() {
        let selector = Arc::new(QuoteSelector::new(vec![Box::new(AlwaysSucceeds)]));
        let fee_calculator = Arc::new(FeeCalculator::new(FeeConfig {
            platform_fee_rate: 0.0001,
            referrer_share: 0.7,
            treasury_address: "0xtreasury".to_string(),
        }));
        let (tx, mut rx) = mpsc::channel(16);
        let deps = StreamDeps {
            token_processor_selector: selector,
            fee_calculator,
            metrics: Arc::new(MetricsCollector::new()),
        };
        run_pipeline(context(), tx, deps, CancellationToken::new(), ActivityClock::new()).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        let complete = events.iter().find_map(|e| match e {
            StreamEvent::Complete { transactions, metadata, .. } => Some((transactions.clone(), metadata.clone())),
            _ => None,
        });
        let (transactions, metadata) = complete.expect("expected a complete event");
        assert_eq!(transactions.len(), 3);
        assert_eq!(metadata.fee_info.fee_transaction_count, 1);
    }
}
