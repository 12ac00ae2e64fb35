// Prometheus text-exposition handler (ambient, spec.md §6 "Added
// ambient endpoints"), mirroring the teacher's `handlers/metrics.rs`.
use axum::extract::State;

use crate::state::AppState;

pub async fn prometheus_metrics(State(state): State<AppState>) -> String {
    state.metrics.record_uptime();
    state.prometheus_handle.render()
}
