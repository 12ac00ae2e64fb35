// Shared types and utilities for the dust-zap intent-execution gateway

pub mod config;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod types;
pub mod wei;

pub use config::GatewayConfig;
pub use error::{AdapterErrorKind, GatewayError};
pub use metrics::MetricsCollector;
pub use types::*;
