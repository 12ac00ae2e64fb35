// Intent HTTP surface (spec.md §6): `POST /intents/dustZap` and
// `GET /intents/{id}/stream`.
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use dustzap_common::{GatewayError, IntentId};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::intent_handler::{DustTokenInput, DustZapParams, IntentRequest};
use crate::state::AppState;
use crate::stream::{run_heartbeat, run_pipeline, ActivityClock, StreamDeps};

pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GatewayError::Validation(_) | GatewayError::NoDustTokens => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::PriceFetchFailed(_)
            | GatewayError::NoLiquidity
            | GatewayError::UnsupportedToken
            | GatewayError::RateLimited
            | GatewayError::NetworkError(_)
            | GatewayError::UpstreamError(_)
            | GatewayError::Http(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Cancelled => StatusCode::BAD_REQUEST,
            GatewayError::ContextStoreFull | GatewayError::Internal(_) | GatewayError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({
            "error": self.0.to_string(),
            "errorCategory": self.0.wire_code(),
        }));
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DustZapParamsBody {
    pub to_token_address: String,
    pub to_token_decimals: u8,
    pub slippage: Option<f64>,
    pub referral_address: Option<String>,
    pub target_token: Option<String>,
    pub dust_tokens: Option<Vec<DustTokenBody>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DustTokenBody {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub raw_amount_hex: String,
    pub price_usd: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DustZapRequestBody {
    pub user_address: String,
    pub chain_id: i64,
    pub params: DustZapParamsBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DustZapResponseBody {
    pub intent_id: String,
    pub stream_url: String,
    pub mode: &'static str,
    pub metadata: DustZapMetadataBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DustZapMetadataBody {
    pub estimated_duration_ms: u64,
    pub total_tokens: usize,
}

pub async fn submit_dust_zap(
    State(state): State<AppState>,
    Json(body): Json<DustZapRequestBody>,
) -> Result<Json<DustZapResponseBody>, ApiError> {
    let request = IntentRequest {
        user_address: body.user_address,
        chain_id: body.chain_id,
        params: DustZapParams {
            to_token_address: body.params.to_token_address,
            to_token_decimals: body.params.to_token_decimals,
            slippage: body.params.slippage,
            referral_address: body.params.referral_address,
            target_token: body.params.target_token,
            dust_tokens: body.params.dust_tokens.map(|tokens| {
                tokens
                    .into_iter()
                    .map(|t| DustTokenInput {
                        address: t.address,
                        symbol: t.symbol,
                        decimals: t.decimals,
                        raw_amount_hex: t.raw_amount_hex,
                        price_usd: t.price_usd,
                    })
                    .collect()
            }),
        },
    };

    let outcome = state.registry.dispatch("dustZap", request).await?;
    state.metrics.record_http_request("POST", "/intents/dustZap", 200);

    Ok(Json(DustZapResponseBody {
        intent_id: outcome.intent_id.to_string(),
        stream_url: outcome.stream_url,
        mode: "streaming",
        metadata: DustZapMetadataBody {
            estimated_duration_ms: outcome.estimated_duration_ms,
            total_tokens: outcome.total_tokens,
        },
    }))
}

pub async fn stream_intent(
    State(state): State<AppState>,
    Path(intent_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let context = state
        .context_store
        .take(&IntentId(intent_id.clone()))
        .await
        .ok_or_else(|| ApiError(GatewayError::NotFound(intent_id)))?;

    let (tx, rx) = tokio::sync::mpsc::channel(64);
    let cancel = CancellationToken::new();

    let deps = StreamDeps {
        token_processor_selector: state.selector.clone(),
        fee_calculator: state.fee_calculator.clone(),
        metrics: state.metrics.clone(),
    };
    let heartbeat_interval = Duration::from_millis(state.config.sse_heartbeat_interval_ms);
    let activity = ActivityClock::new();

    let pipeline_cancel = cancel.clone();
    let pipeline_tx = tx.clone();
    let pipeline_activity = activity.clone();
    tokio::spawn(run_pipeline(context, pipeline_tx, deps, pipeline_cancel, pipeline_activity));

    let heartbeat_cancel = cancel.clone();
    let metrics = state.metrics.clone();
    tokio::spawn(run_heartbeat(tx.clone(), heartbeat_interval, heartbeat_cancel, metrics, activity));

    // Observes the client disconnecting (the paired receiver being
    // dropped) and propagates cancellation to any in-flight adapter call
    // within the spec's 1s bound (spec.md §5 "Cancellation").
    let watcher_cancel = cancel.clone();
    tokio::spawn(async move {
        tx.closed().await;
        watcher_cancel.cancel();
    });

    let event_stream = ReceiverStream::new(rx).map(|event| {
        let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(json))
    });

    Ok(Sse::new(event_stream).keep_alive(axum::response::sse::KeepAlive::new()))
}
