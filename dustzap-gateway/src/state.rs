// Shared application state, built once in `main` and cloned cheaply per
// request (every field is an `Arc`), matching the teacher's `AppState`
// convention in `api-server/src/state.rs`.
use std::sync::Arc;

use dustzap_common::{GatewayConfig, MetricsCollector};
use dustzap_engine::{FeeCalculator, FeeConfig, OneInchAdapter, ParaswapAdapter, QuoteSelector, ZeroExAdapter};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;

use crate::collaborators::{BalanceService, HttpBalanceService, HttpPriceService, PriceService};
use crate::context_store::ContextStore;
use crate::intent_handler::IntentHandler;
use crate::intent_registry::IntentRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub metrics: Arc<MetricsCollector>,
    pub context_store: Arc<ContextStore>,
    pub selector: Arc<QuoteSelector>,
    pub fee_calculator: Arc<FeeCalculator>,
    pub registry: Arc<IntentRegistry>,
    pub shutdown: CancellationToken,
    pub prometheus_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(config: GatewayConfig, prometheus_handle: PrometheusHandle) -> Self {
        let metrics = Arc::new(MetricsCollector::new());
        let context_store = Arc::new(ContextStore::new(
            config.max_contexts,
            config.sse_connection_timeout_ms,
            metrics.clone(),
        ));

        let http_client = reqwest::Client::new();
        let selector = Arc::new(QuoteSelector::new(vec![
            Box::new(OneInchAdapter::new(http_client.clone(), config.one_inch_api_key.clone())),
            Box::new(ParaswapAdapter::new(http_client.clone(), config.paraswap_partner.clone())),
            Box::new(ZeroExAdapter::new(http_client.clone(), config.zero_ex_api_key.clone())),
        ]));

        let fee_calculator = Arc::new(FeeCalculator::new(FeeConfig {
            platform_fee_rate: config.platform_fee_rate,
            referrer_share: config.referrer_fee_share,
            treasury_address: config.treasury_address.clone(),
        }));

        let balance_service: Arc<dyn BalanceService> = Arc::new(HttpBalanceService::new(
            http_client.clone(),
            std::env::var("WALLET_BALANCE_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:4000".to_string()),
        ));
        let price_service: Arc<dyn PriceService> = Arc::new(HttpPriceService::new(
            http_client,
            std::env::var("PRICE_SERVICE_URL").unwrap_or_else(|_| "http://localhost:4001".to_string()),
        ));

        let handler = Arc::new(IntentHandler::new(
            config.clone(),
            context_store.clone(),
            balance_service,
            price_service,
        ));
        let mut registry = IntentRegistry::new();
        registry.register("dustZap", handler);

        Self {
            config: Arc::new(config),
            metrics,
            context_store,
            selector,
            fee_calculator,
            registry: Arc::new(registry),
            shutdown: CancellationToken::new(),
            prometheus_handle,
        }
    }
}
