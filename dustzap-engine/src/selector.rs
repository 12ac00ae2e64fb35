// Quote Selector (C2): fans out to all adapters in parallel, waits for
// all to settle, and ranks successful quotes on `toUSD - gasCostUSD`.
use dustzap_common::{AdapterErrorKind, QuoteRequest, SwapQuote};
use futures::future::join_all;

use crate::adapters::{AdapterError, QuoteAdapter};

pub struct QuoteSelector {
    adapters: Vec<Box<dyn QuoteAdapter>>,
}

#[derive(Debug, Clone)]
pub struct SelectorError {
    pub kind: AdapterErrorKind,
    /// Per-provider diagnostics, kept for logging (spec.md §4.2).
    pub diagnostics: Vec<(String, String)>,
}

impl std::fmt::Display for SelectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "all adapters failed: {}", self.kind.wire_code())
    }
}

impl std::error::Error for SelectorError {}

impl QuoteSelector {
    pub fn new(adapters: Vec<Box<dyn QuoteAdapter>>) -> Self {
        Self { adapters }
    }

    async fn fan_out(&self, req: &QuoteRequest) -> Vec<(String, Result<SwapQuote, AdapterError>)> {
        let futures = self.adapters.iter().map(|adapter| async move {
            let name = adapter.name().to_string();
            let result = adapter.get_swap_data(req).await;
            (name, result)
        });
        join_all(futures).await
    }

    /// Ranks by `toUSD - gasCostUSD` descending, tie-broken lexicographically
    /// by provider name (spec.md §4.2). Returns indices into `results` in
    /// rank order (best first).
    fn rank(results: &[(String, Result<SwapQuote, AdapterError>)]) -> Vec<usize> {
        let mut successes: Vec<usize> = results
            .iter()
            .enumerate()
            .filter_map(|(i, (_, r))| r.as_ref().ok().map(|_| i))
            .collect();
        successes.sort_by(|&a, &b| {
            let qa = results[a].1.as_ref().unwrap();
            let qb = results[b].1.as_ref().unwrap();
            qb.net_usd()
                .partial_cmp(&qa.net_usd())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| results[a].0.cmp(&results[b].0))
        });
        successes
    }

    /// `getBest(req) -> SwapQuote` (spec.md §4.2).
    pub async fn get_best(&self, req: &QuoteRequest) -> Result<SwapQuote, SelectorError> {
        let results = self.fan_out(req).await;
        let ranked = Self::rank(&results);
        match ranked.first() {
            Some(&idx) => Ok(results[idx].1.clone().unwrap()),
            None => Err(Self::aggregate_failure(&results)),
        }
    }

    /// `getSecondBest(req) -> SwapQuote`: returns rank 2 if at least two
    /// adapters succeeded, else rank 1 (spec.md §4.2).
    pub async fn get_second_best(&self, req: &QuoteRequest) -> Result<SwapQuote, SelectorError> {
        let results = self.fan_out(req).await;
        let ranked = Self::rank(&results);
        let idx = ranked.get(1).or_else(|| ranked.first());
        match idx {
            Some(&idx) => Ok(results[idx].1.clone().unwrap()),
            None => Err(Self::aggregate_failure(&results)),
        }
    }

    fn aggregate_failure(results: &[(String, Result<SwapQuote, AdapterError>)]) -> SelectorError {
        let diagnostics: Vec<(String, String)> = results
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.clone(), e.to_string())))
            .collect();
        let kind = AdapterErrorKind::most_informative(
            results.iter().filter_map(|(_, r)| r.as_ref().err().map(|e| e.kind)),
        );
        SelectorError { kind, diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::QuoteAdapter;
    use async_trait::async_trait;
    use ethers_core::types::U256;

    struct FakeAdapter {
        name: &'static str,
        result: Result<SwapQuote, AdapterError>,
    }

    #[async_trait]
    impl QuoteAdapter for FakeAdapter {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn get_swap_data(&self, _req: &QuoteRequest) -> Result<SwapQuote, AdapterError> {
            self.result.clone()
        }
    }

    fn quote(provider: &str, to_usd: f64, gas_cost_usd: f64) -> SwapQuote {
        SwapQuote {
            provider: provider.to_string(),
            to: "0xrouter".to_string(),
            approve_to: "0xrouter".to_string(),
            to_amount: U256::from(1000u64),
            min_to_amount: U256::from(990u64),
            data: "0x".to_string(),
            gas: U256::from(100_000u64),
            gas_cost_usd,
            to_usd,
            custom_slippage: None,
        }
    }

    fn req() -> QuoteRequest {
        QuoteRequest {
            chain_id: 1,
            from_token_address: "0xfrom".to_string(),
            from_token_decimals: 18,
            to_token_address: "0xto".to_string(),
            to_token_decimals: 18,
            amount: U256::from(1u64),
            from_address: "0xuser".to_string(),
            slippage_pct: 1.0,
            eth_price_usd: 3000.0,
            to_token_price_usd: 1.0,
        }
    }

    #[tokio::test]
    async fn picks_highest_net_usd() {
        let selector = QuoteSelector::new(vec![
            Box::new(FakeAdapter { name: "1inch", result: Ok(quote("1inch", 10.0, 1.0)) }),
            Box::new(FakeAdapter { name: "paraswap", result: Ok(quote("paraswap", 12.0, 1.0)) }),
        ]);
        let best = selector.get_best(&req()).await.unwrap();
        assert_eq!(best.provider, "paraswap");
    }

    #[tokio::test]
    async fn aggregates_failure_kind_by_precedence() {
        let selector = QuoteSelector::new(vec![
            Box::new(FakeAdapter {
                name: "1inch",
                result: Err(AdapterError::new(AdapterErrorKind::RateLimited, "429")),
            }),
            Box::new(FakeAdapter {
                name: "0x",
                result: Err(AdapterError::new(AdapterErrorKind::NoLiquidity, "no route")),
            }),
        ]);
        let err = selector.get_best(&req()).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::NoLiquidity);
    }

    #[tokio::test]
    async fn second_best_falls_back_to_first_with_one_success() {
        let selector = QuoteSelector::new(vec![
            Box::new(FakeAdapter { name: "1inch", result: Ok(quote("1inch", 10.0, 1.0)) }),
            Box::new(FakeAdapter {
                name: "0x",
                result: Err(AdapterError::new(AdapterErrorKind::NoLiquidity, "no route")),
            }),
        ]);
        let second = selector.get_second_best(&req()).await.unwrap();
        assert_eq!(second.provider, "1inch");
    }
}
