// Context Manager (C8): keyed store of in-flight execution contexts with
// TTL eviction and at-most-once consume. A plain `Mutex<HashMap>` is used
// instead of `DashMap` because `put`/`take` must be atomic as a pair — a
// sharded map doesn't give that for free without its own extra locking
// (see DESIGN.md for the Open Question resolution).
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dustzap_common::{ExecutionContext, IntentId, MetricsCollector};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

struct Entry {
    context: ExecutionContext,
    created_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutError {
    Full,
}

pub struct ContextStore {
    entries: Mutex<HashMap<IntentId, Entry>>,
    max_contexts: usize,
    connection_timeout_ms: u64,
    metrics: Arc<MetricsCollector>,
}

impl ContextStore {
    pub fn new(max_contexts: usize, connection_timeout_ms: u64, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_contexts,
            connection_timeout_ms,
            metrics,
        }
    }

    /// `put(id, ctx)` (spec.md §4.8). Rejects with `PutError::Full` rather
    /// than evicting in-flight contexts when `maxContexts` is exceeded.
    pub async fn put(&self, context: ExecutionContext) -> Result<(), PutError> {
        let mut entries = self.entries.lock().await;
        if entries.len() >= self.max_contexts {
            return Err(PutError::Full);
        }
        let created_at_ms = context.created_at_ms;
        entries.insert(context.intent_id.clone(), Entry { context, created_at_ms });
        self.metrics.record_context_count(entries.len());
        Ok(())
    }

    /// `take(id) -> ctx|None`, atomic remove-on-read (spec.md §4.8):
    /// `take` returning a context guarantees no other caller receives it.
    pub async fn take(&self, id: &IntentId) -> Option<ExecutionContext> {
        let mut entries = self.entries.lock().await;
        let taken = entries.remove(id).map(|entry| entry.context);
        self.metrics.record_context_count(entries.len());
        taken
    }

    /// `evictExpired()` (spec.md §4.8): removes entries older than
    /// `connectionTimeoutMs`.
    pub async fn evict_expired(&self, now_ms: u64) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now_ms.saturating_sub(entry.created_at_ms) < self.connection_timeout_ms);
        let evicted = before - entries.len();
        if evicted > 0 {
            self.metrics.record_context_evicted("ttl");
            info!(evicted, "evicted expired execution contexts");
        }
        self.metrics.record_context_count(entries.len());
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

/// Spawns the background cleanup task (spec.md §4.8), cancellable via
/// `token` the same way the SSE heartbeat ticker (C7) is.
pub fn spawn_cleanup_task(
    store: Arc<ContextStore>,
    cleanup_interval_ms: u64,
    token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(cleanup_interval_ms));
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let now_ms = current_unix_millis();
                    store.evict_expired(now_ms).await;
                }
            }
        }
    })
}

fn current_unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustzap_common::ToToken;

    fn context(id: &str, created_at_ms: u64) -> ExecutionContext {
        ExecutionContext {
            intent_id: IntentId(id.to_string()),
            user_address: "0xuser".to_string(),
            chain_id: 1,
            dust_tokens: vec![],
            eth_price_usd: 3000.0,
            to_token: ToToken { address: "0xeth".to_string(), decimals: 18, price_usd: 3000.0 },
            slippage_pct: 1.0,
            referral_address: None,
            created_at_ms,
        }
    }

    #[tokio::test]
    async fn take_is_at_most_once() {
        let store = ContextStore::new(10, 300_000, Arc::new(MetricsCollector::new()));
        store.put(context("a", 0)).await.unwrap();
        let id = IntentId("a".to_string());
        assert!(store.take(&id).await.is_some());
        assert!(store.take(&id).await.is_none());
    }

    #[tokio::test]
    async fn put_rejects_when_full() {
        let store = ContextStore::new(1, 300_000, Arc::new(MetricsCollector::new()));
        store.put(context("a", 0)).await.unwrap();
        let err = store.put(context("b", 0)).await.unwrap_err();
        assert_eq!(err, PutError::Full);
    }

    #[tokio::test]
    async fn evict_expired_removes_old_entries_only() {
        let store = ContextStore::new(10, 1_000, Arc::new(MetricsCollector::new()));
        store.put(context("old", 0)).await.unwrap();
        store.put(context("fresh", 5_000)).await.unwrap();
        let evicted = store.evict_expired(5_500).await;
        assert_eq!(evicted, 1);
        assert_eq!(store.len().await, 1);
    }
}
