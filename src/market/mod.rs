pub mod fallback;
pub mod history;
pub mod providers;
pub mod sentiment;

use serde::{Deserialize, Serialize};

/// Provider-agnostic market record. Every adapter normalizes into this shape;
/// metrics the upstream payload omits stay `None`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Coin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: Option<f64>,
    pub change_1h: Option<f64>,
    pub change_24h: Option<f64>,
    pub market_cap: Option<f64>,
}

/// One fetch result: the normalized coins plus the provider that produced them.
#[derive(Clone, Debug)]
pub struct ProviderResult {
    pub coins: Vec<Coin>,
    pub provider: String,
}

/// Inputs common to every provider fetch.
#[derive(Clone, Debug)]
pub struct MarketQuery {
    /// Fiat currency code, lower case (e.g. "usd").
    pub currency: String,
    /// Explicit coin ids; overrides top-N ranking when non-empty.
    pub ids: Vec<String>,
    /// Number of top coins to return when no explicit ids are given.
    pub top_n: usize,
}

impl MarketQuery {
    pub fn top(currency: &str, top_n: usize) -> Self {
        MarketQuery {
            currency: currency.to_lowercase(),
            ids: Vec::new(),
            top_n,
        }
    }

    pub fn by_ids(currency: &str, ids: Vec<String>) -> Self {
        MarketQuery {
            currency: currency.to_lowercase(),
            ids,
            top_n: 0,
        }
    }

    pub fn has_ids(&self) -> bool {
        !self.ids.is_empty()
    }
}
