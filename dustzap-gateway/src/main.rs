// dust-zap intent-execution gateway: HTTP interface over the streaming
// engine (axum + tower, matching the teacher's api-server/src/main.rs).
use axum::routing::{get, post};
use axum::Router;
use dotenvy::dotenv;
use dustzap_common::GatewayConfig;
use dustzap_gateway::context_store::spawn_cleanup_task;
use dustzap_gateway::handlers::{health, intents, metrics as metrics_handler};
use dustzap_gateway::state::AppState;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dustzap_gateway=info,axum=info".to_string()),
        )
        .init();

    info!("starting dust-zap intent-execution gateway v{}", env!("CARGO_PKG_VERSION"));

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus metrics recorder");

    let config = GatewayConfig::from_env();
    let state = AppState::new(config.clone(), prometheus_handle);

    let cleanup_handle =
        spawn_cleanup_task(state.context_store.clone(), config.cleanup_interval_ms, state.shutdown.clone());

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics_handler::prometheus_metrics))
        .route("/intents/dustZap", post(intents::submit_dust_zap))
        .route("/intents/:id/stream", get(intents::stream_intent))
        .with_state(state.clone())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("API_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(3001);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("gateway listening on {addr}");
    info!("metrics available at http://{addr}/metrics");
    info!("health check available at http://{addr}/health");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        })
        .await
        .map_err(|e| {
            error!("server error: {e}");
            e
        })?;

    cleanup_handle.abort();
    Ok(())
}
