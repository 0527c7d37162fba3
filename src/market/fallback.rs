//! Ordered multi-provider fetch.
//!
//! Providers are tried strictly in the configured priority order. The first
//! one that succeeds with a non-empty result wins; anything else is logged
//! and skipped. Exhausting the list is `Error::AllProvidersFailed` — whether
//! that aborts the process or just the cycle is the caller's policy.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::market::providers::MarketProvider;
use crate::market::{Coin, MarketQuery, ProviderResult};

pub struct FallbackFetcher {
    providers: Vec<Box<dyn MarketProvider>>,
}

impl FallbackFetcher {
    pub fn new(providers: Vec<Box<dyn MarketProvider>>) -> Self {
        FallbackFetcher { providers }
    }

    pub async fn fetch(&self, query: &MarketQuery) -> Result<ProviderResult> {
        for provider in &self.providers {
            match provider.fetch(query).await {
                Ok(coins) if coins.is_empty() => {
                    tracing::warn!(provider = provider.name(), "Provider returned no data");
                }
                Ok(coins) => {
                    return Ok(ProviderResult {
                        coins: dedup_by_id(coins),
                        provider: provider.name().to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Provider failed");
                }
            }
        }
        tracing::error!("All market data providers failed");
        Err(Error::AllProvidersFailed)
    }
}

/// Suppress duplicate ids from a misbehaving source; first occurrence wins.
fn dedup_by_id(coins: Vec<Coin>) -> Vec<Coin> {
    let mut seen = HashSet::new();
    coins
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    enum Behavior {
        Fail,
        Empty,
        Coins(Vec<Coin>),
    }

    struct StubProvider {
        name: &'static str,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn boxed(name: &'static str, behavior: Behavior, calls: &Arc<AtomicUsize>) -> Box<Self> {
            Box::new(StubProvider {
                name,
                behavior,
                calls: Arc::clone(calls),
            })
        }
    }

    #[async_trait]
    impl MarketProvider for StubProvider {
        async fn fetch(&self, _query: &MarketQuery) -> Result<Vec<Coin>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Fail => Err(Error::EmptyResult(self.name.to_string())),
                Behavior::Empty => Ok(Vec::new()),
                Behavior::Coins(coins) => Ok(coins.clone()),
            }
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    fn coin(id: &str) -> Coin {
        Coin {
            id: id.to_string(),
            symbol: id.to_uppercase(),
            name: id.to_string(),
            price: Some(1.0),
            change_1h: None,
            change_24h: None,
            market_cap: None,
        }
    }

    #[tokio::test]
    async fn first_non_empty_provider_wins_and_later_ones_are_not_called() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let c = Arc::new(AtomicUsize::new(0));

        let fetcher = FallbackFetcher::new(vec![
            StubProvider::boxed("first", Behavior::Fail, &a),
            StubProvider::boxed("second", Behavior::Coins(vec![coin("bitcoin")]), &b),
            StubProvider::boxed("third", Behavior::Coins(vec![coin("ethereum")]), &c),
        ]);

        let result = fetcher.fetch(&MarketQuery::top("usd", 10)).await.unwrap();
        assert_eq!(result.provider, "second");
        assert_eq!(result.coins, vec![coin("bitcoin")]);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(c.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_result_falls_through_to_next_provider() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        let fetcher = FallbackFetcher::new(vec![
            StubProvider::boxed("first", Behavior::Empty, &a),
            StubProvider::boxed("second", Behavior::Coins(vec![coin("bitcoin")]), &b),
        ]);

        let result = fetcher.fetch(&MarketQuery::top("usd", 10)).await.unwrap();
        assert_eq!(result.provider, "second");
    }

    #[tokio::test]
    async fn exhausting_all_providers_is_a_total_failure() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        let fetcher = FallbackFetcher::new(vec![
            StubProvider::boxed("first", Behavior::Fail, &a),
            StubProvider::boxed("second", Behavior::Empty, &b),
        ]);

        let err = fetcher
            .fetch(&MarketQuery::top("usd", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AllProvidersFailed));
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_ids_are_silently_suppressed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = FallbackFetcher::new(vec![StubProvider::boxed(
            "only",
            Behavior::Coins(vec![coin("bitcoin"), coin("ethereum"), coin("bitcoin")]),
            &calls,
        )]);

        let result = fetcher.fetch(&MarketQuery::top("usd", 10)).await.unwrap();
        assert_eq!(
            result.coins.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["bitcoin", "ethereum"]
        );
    }
}
