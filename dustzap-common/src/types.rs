// Core data model for the dust-zap intent-execution gateway.
// JSON-serializable and wire-compatible with the SSE/HTTP surface in
// spec.md §6.
use chrono::{DateTime, Utc};
use ethers_core::types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single dust token balance accepted into an intent. Immutable once
/// constructed; `raw_amount` is parsed once from `raw_amount_hex` and
/// never re-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(rename = "priceUSD")]
    pub price_usd: f64,
    pub human_amount: f64,
    pub raw_amount_hex: String,
}

impl Token {
    /// Parses `raw_amount_hex` into a big-unsigned integer. Accepts an
    /// optional `0x` prefix; rejects anything that isn't pure hex digits.
    pub fn parse_raw_amount(&self) -> Option<U256> {
        let trimmed = self.raw_amount_hex.strip_prefix("0x").unwrap_or(&self.raw_amount_hex);
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        U256::from_str_radix(trimmed, 16).ok()
    }

    pub fn input_usd(&self) -> f64 {
        self.human_amount * self.price_usd
    }
}

/// The target token an intent zaps dust into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToToken {
    pub address: String,
    pub decimals: u8,
    pub price_usd: f64,
}

/// A normalized, calldata-ready swap proposal returned by one DEX
/// aggregator adapter (C1) and chosen by the selector (C2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuote {
    pub provider: String,
    pub to: String,
    pub approve_to: String,
    pub to_amount: U256,
    pub min_to_amount: U256,
    pub data: String,
    pub gas: U256,
    pub gas_cost_usd: f64,
    pub to_usd: f64,
    pub custom_slippage: Option<f64>,
}

impl SwapQuote {
    /// Net-of-gas USD value used for ranking (spec.md §4.2): the selector
    /// always compares on `toUSD - gasCostUSD` regardless of whether an
    /// individual adapter's `toUSD` already subtracted gas.
    pub fn net_usd(&self) -> f64 {
        self.to_usd - self.gas_cost_usd
    }
}

/// Request passed from the token processor (C6) down through the
/// selector (C2) to each adapter (C1).
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub chain_id: u64,
    pub from_token_address: String,
    pub from_token_decimals: u8,
    pub to_token_address: String,
    pub to_token_decimals: u8,
    pub amount: U256,
    pub from_address: String,
    pub slippage_pct: f64,
    pub eth_price_usd: f64,
    pub to_token_price_usd: f64,
}

/// Globally-unique, printable-ASCII intent identifier:
/// `<intentType>_<unixMillis>_<last6OfUserAddr>_<16 random hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentId(pub String);

impl IntentId {
    pub fn new(intent_type: &str, unix_millis: u64, user_address: &str, rng_hex: &str) -> Self {
        let tail: String = user_address
            .trim_start_matches("0x")
            .chars()
            .rev()
            .take(6)
            .collect::<String>()
            .chars()
            .rev()
            .collect();
        Self(format!("{intent_type}_{unix_millis}_{tail}_{rng_hex}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution context produced by the intent handler (C9), stored by the
/// context manager (C8), and consumed exactly once by the streaming
/// pipeline (C7).
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub intent_id: IntentId,
    pub user_address: String,
    pub chain_id: u64,
    pub dust_tokens: Vec<Token>,
    pub eth_price_usd: f64,
    pub to_token: ToToken,
    pub slippage_pct: f64,
    pub referral_address: Option<String>,
    pub created_at_ms: u64,
}

/// A single calldata-ready transaction emitted by the builder (C4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub to: String,
    /// Decimal wei, as a string (may exceed u64/i64 range).
    pub value: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub gas_limit: String,
}

/// Per-token trading-loss metrics reported alongside both success and
/// failure outcomes (spec.md §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingLoss {
    #[serde(rename = "inputUSD")]
    pub input_usd: f64,
    #[serde(rename = "outputUSD")]
    pub output_usd: f64,
    #[serde(rename = "netLossUSD")]
    pub net_loss_usd: f64,
    pub loss_pct: f64,
}

/// Aggregate fee summary exposed to clients. Deliberately omits the
/// index range of fee transactions within the batch (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeInfo {
    pub total_fee_usd: f64,
    #[serde(rename = "referrerFeeUSD")]
    pub referrer_fee_usd: f64,
    #[serde(rename = "treasuryFee")]
    pub treasury_fee_usd: f64,
    pub fee_transaction_count: u8,
}

/// Aggregate metadata attached to the terminal `complete` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMetadata {
    pub total_tokens: usize,
    pub processed_tokens: usize,
    #[serde(rename = "totalValueUSD")]
    pub total_value_usd: f64,
    pub fee_info: FeeInfo,
    pub estimated_total_gas: String,
}

/// Outcome of a single dust token going through the Token Processor
/// (C6). A tagged sum rather than a loose object with optional fields
/// (spec.md §9 DESIGN NOTES: "dynamic types -> tagged variants").
#[derive(Debug, Clone)]
pub enum TokenOutcome {
    Success {
        quote: SwapQuote,
        approve_index: usize,
        swap_index: usize,
        trading_loss: TradingLoss,
    },
    Failure {
        kind: crate::error::AdapterErrorKind,
        message: String,
        user_message: String,
        trading_loss: TradingLoss,
        provider: Option<String>,
    },
}

/// The SSE event tagged union (spec.md §3, §6). `timestamp` is ISO-8601.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum StreamEvent {
    #[serde(rename_all = "camelCase")]
    Connected {
        intent_id: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    TokenReady {
        token_index: usize,
        token_symbol: String,
        token_address: String,
        transactions: Vec<Transaction>,
        provider: String,
        expected_token_amount: String,
        min_to_amount: String,
        to_usd: f64,
        #[serde(rename = "gasCostUSD")]
        gas_cost_usd: f64,
        trading_loss: TradingLoss,
        progress: f64,
        processed_tokens: usize,
        total_tokens: usize,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    TokenFailed {
        token_index: usize,
        token_symbol: String,
        token_address: String,
        error: String,
        error_category: String,
        user_friendly_message: String,
        provider: String,
        trading_loss: TradingLoss,
        progress: f64,
        processed_tokens: usize,
        total_tokens: usize,
        timestamp: DateTime<Utc>,
    },
    Complete {
        transactions: Vec<Transaction>,
        metadata: CompleteMetadata,
        timestamp: DateTime<Utc>,
    },
    Error {
        error: String,
        timestamp: DateTime<Utc>,
    },
    Heartbeat {
        timestamp: DateTime<Utc>,
    },
}

/// Used only for float-precision display values; wei-scale arithmetic
/// always goes through `U256` in [`crate::wei`].
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or_default()
}
