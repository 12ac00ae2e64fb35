// Environment-driven configuration, matching the `std::env::var` +
// `unwrap_or_else` default style used throughout the teacher's
// `AppState::new` / `ArbitrageConfig`.
use std::env;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub platform_fee_rate: f64,
    pub referrer_fee_share: f64,
    pub treasury_address: String,

    pub one_inch_api_key: Option<String>,
    pub paraswap_partner: Option<String>,
    pub zero_ex_api_key: Option<String>,

    pub sse_heartbeat_interval_ms: u64,
    pub sse_connection_timeout_ms: u64,
    pub sse_max_connections: usize,

    pub cleanup_interval_ms: u64,
    pub max_contexts: usize,

    pub dust_threshold_usd: f64,
    pub allowed_target_tokens: Vec<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            platform_fee_rate: env_f64("PLATFORM_FEE_RATE", 0.0001),
            referrer_fee_share: env_f64("REFERRER_FEE_SHARE", 0.7),
            treasury_address: env::var("TREASURY_ADDRESS")
                .unwrap_or_else(|_| "0x0000000000000000000000000000000000000000".to_string()),

            one_inch_api_key: env::var("ONEINCH_API_KEY").ok(),
            paraswap_partner: env::var("PARASWAP_PARTNER").ok(),
            zero_ex_api_key: env::var("ZEROEX_API_KEY").ok(),

            sse_heartbeat_interval_ms: env_u64("SSE_HEARTBEAT_INTERVAL", 30_000),
            sse_connection_timeout_ms: env_u64("SSE_CONNECTION_TIMEOUT", 5 * 60 * 1000),
            sse_max_connections: env_usize("SSE_MAX_CONNECTIONS", 1000),

            cleanup_interval_ms: env_u64("CONTEXT_CLEANUP_INTERVAL_MS", 60_000),
            max_contexts: env_usize("MAX_CONTEXTS", 1000),

            dust_threshold_usd: env_f64("DUST_THRESHOLD_USD", 0.005),
            allowed_target_tokens: env::var("ALLOWED_TARGET_TOKENS")
                .unwrap_or_else(|_| "ETH".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
