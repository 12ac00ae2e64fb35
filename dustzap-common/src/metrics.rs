// Metrics collection for the dust-zap gateway, exposed on GET /metrics
// via a Prometheus exporter (see SPEC_FULL.md §3).
use metrics::{counter, gauge, histogram};
use std::time::Instant;

pub struct MetricsCollector {
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    // HTTP surface
    pub fn record_http_request(&self, method: &str, path: &str, status_code: u16) {
        counter!("http_requests_total",
            "method" => method.to_string(),
            "path" => path.to_string(),
            "status" => status_code.to_string())
            .increment(1);
    }

    pub fn record_http_latency(&self, latency_ms: f64, method: &str, path: &str) {
        histogram!("http_request_duration_ms", "method" => method.to_string(), "path" => path.to_string())
            .record(latency_ms);
    }

    // Adapter fan-out (C1/C2/C3)
    pub fn record_adapter_call(&self, provider: &str, outcome: &str) {
        counter!("adapter_calls_total", "provider" => provider.to_string(), "outcome" => outcome.to_string())
            .increment(1);
    }

    pub fn record_adapter_retry(&self, provider: &str) {
        counter!("adapter_retries_total", "provider" => provider.to_string()).increment(1);
    }

    pub fn record_adapter_latency_ms(&self, provider: &str, latency_ms: f64) {
        histogram!("adapter_latency_ms", "provider" => provider.to_string()).record(latency_ms);
    }

    // Token processing (C6)
    pub fn record_token_processed(&self, outcome: &str) {
        counter!("tokens_processed_total", "outcome" => outcome.to_string()).increment(1);
    }

    // Streaming pipeline (C7)
    pub fn record_stream_opened(&self) {
        counter!("streams_opened_total").increment(1);
    }

    pub fn record_stream_closed(&self, reason: &str) {
        counter!("streams_closed_total", "reason" => reason.to_string()).increment(1);
    }

    pub fn record_heartbeat_sent(&self) {
        counter!("stream_heartbeats_total").increment(1);
    }

    // Context store (C8)
    pub fn record_context_count(&self, count: usize) {
        gauge!("context_store_size").set(count as f64);
    }

    pub fn record_context_evicted(&self, reason: &str) {
        counter!("context_evictions_total", "reason" => reason.to_string()).increment(1);
    }

    pub fn record_uptime(&self) {
        let uptime_seconds = self.start_time.elapsed().as_secs() as f64;
        gauge!("uptime_seconds").set(uptime_seconds);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
