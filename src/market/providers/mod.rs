pub mod coincap;
pub mod coingecko;
pub mod coinpaprika;
pub mod cryptocompare;

pub use coincap::CoinCapProvider;
pub use coingecko::CoinGeckoProvider;
pub use coinpaprika::CoinPaprikaProvider;
pub use cryptocompare::CryptoCompareProvider;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::market::{Coin, MarketQuery};

/// One external market-data API.
///
/// Implementations perform a single HTTP call per `fetch` and normalize the
/// response into `Coin` records. Retries and fallback are the caller's job.
#[async_trait]
pub trait MarketProvider: Send + Sync {
    /// Fetch and normalize market data for the given query.
    async fn fetch(&self, query: &MarketQuery) -> Result<Vec<Coin>>;

    /// Human-readable provider name, used in logs and the posted report.
    fn name(&self) -> &'static str;
}

/// The fixed fallback order used by every deployment.
pub fn default_providers(client: &Client) -> Vec<Box<dyn MarketProvider>> {
    vec![
        Box::new(CoinGeckoProvider::new(client.clone())),
        Box::new(CoinPaprikaProvider::new(client.clone())),
        Box::new(CoinCapProvider::new(client.clone())),
        Box::new(CryptoCompareProvider::new(client.clone())),
    ]
}
