// Error types for the dust-zap intent-execution gateway
use serde::Serialize;
use thiserror::Error;

/// Classification of an adapter-level (DEX aggregator) failure. Drives
/// retry eligibility (C3) and cross-adapter precedence when every
/// adapter fails for a token (C2).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdapterErrorKind {
    #[error("no liquidity available")]
    NoLiquidity,
    #[error("rate limited")]
    RateLimited,
    #[error("upstream error")]
    UpstreamError,
    #[error("network error")]
    NetworkError,
    #[error("unsupported token")]
    UnsupportedToken,
    #[error("unknown error")]
    Unknown,
    #[error("validation error")]
    Validation,
}

impl AdapterErrorKind {
    /// Classifies a raw HTTP status + body text the way each adapter's
    /// transport layer must per spec.md §4.1.
    pub fn classify(status: Option<u16>, body: &str) -> Self {
        let lower = body.to_lowercase();
        if status == Some(429) || lower.contains("rate limit") || lower.contains("quota") {
            return Self::RateLimited;
        }
        if lower.contains("liquidity") || lower.contains("insufficient") {
            return Self::NoLiquidity;
        }
        if lower.contains("unsupported") || lower.contains("not found") || lower.contains("invalid token")
        {
            return Self::UnsupportedToken;
        }
        match status {
            Some(s) if (500..600).contains(&s) => Self::UpstreamError,
            Some(408) => Self::NetworkError,
            _ => Self::Unknown,
        }
    }

    /// Precedence used when aggregating per-provider failures into one
    /// failure kind (spec.md §4.2): NO_LIQUIDITY > UNSUPPORTED_TOKEN >
    /// RATE_LIMITED > NETWORK_ERROR > UPSTREAM_ERROR > UNKNOWN.
    fn precedence(self) -> u8 {
        match self {
            Self::NoLiquidity => 0,
            Self::UnsupportedToken => 1,
            Self::RateLimited => 2,
            Self::NetworkError => 3,
            Self::UpstreamError => 4,
            Self::Unknown => 5,
            Self::Validation => 6,
        }
    }

    pub fn most_informative(kinds: impl IntoIterator<Item = Self>) -> Self {
        kinds
            .into_iter()
            .min_by_key(|k| k.precedence())
            .unwrap_or(Self::Unknown)
    }

    /// Whether an adapter call that failed with this kind should be retried
    /// per spec.md §4.3. NETWORK_ERROR, RATE_LIMITED, UPSTREAM_ERROR are
    /// retryable; NO_LIQUIDITY and UNSUPPORTED_TOKEN are not.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::NetworkError | Self::RateLimited | Self::UpstreamError)
    }

    pub fn wire_code(self) -> &'static str {
        match self {
            Self::NoLiquidity => "NO_LIQUIDITY",
            Self::RateLimited => "RATE_LIMITED",
            Self::UpstreamError => "UPSTREAM_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::UnsupportedToken => "UNSUPPORTED_TOKEN",
            Self::Unknown => "UNKNOWN_ERROR",
            Self::Validation => "VALIDATION_ERROR",
        }
    }
}

/// Top-level gateway error, mapped to wire codes (spec.md §7) and to HTTP
/// status by the gateway crate's `IntoResponse` impl.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown intent type: {0}")]
    NotFound(String),

    #[error("no dust tokens to process")]
    NoDustTokens,

    #[error("failed to fetch target token price: {0}")]
    PriceFetchFailed(String),

    #[error("no liquidity for token")]
    NoLiquidity,

    #[error("unsupported token")]
    UnsupportedToken,

    #[error("rate limited by upstream provider")]
    RateLimited,

    #[error("network error contacting upstream: {0}")]
    NetworkError(String),

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("too many in-flight intents")]
    ContextStoreFull,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NoDustTokens => "NO_DUST_TOKENS",
            Self::PriceFetchFailed(_) => "PRICE_FETCH_FAILED",
            Self::NoLiquidity => "NO_LIQUIDITY",
            Self::UnsupportedToken => "UNSUPPORTED_TOKEN",
            Self::RateLimited => "RATE_LIMITED",
            Self::NetworkError(_) => "NETWORK_ERROR",
            Self::UpstreamError(_) => "UPSTREAM_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::ContextStoreFull => "INTERNAL_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Http(_) => "NETWORK_ERROR",
            Self::Json(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
