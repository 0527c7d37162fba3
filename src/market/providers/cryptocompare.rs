//! CryptoCompare market data provider.
//!
//! Last resort in the fallback order. `/data/top/mktcapfull` returns coins by
//! market cap with currency-denominated metrics nested under `RAW[UPPER(cur)]`.
//! There is no stable id field, so the lower-cased ticker name stands in for
//! one, and explicit id selection is applied client-side against it.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::market::providers::MarketProvider;
use crate::market::{Coin, MarketQuery};

const BASE_URL: &str = "https://min-api.cryptocompare.com";
const PROVIDER_NAME: &str = "CryptoCompare";

// API page ceiling; used when filtering client-side so the wanted ids are
// likely inside the window.
const MAX_LIMIT: usize = 100;

pub struct CryptoCompareProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RawTopResponse {
    #[serde(rename = "Data", default)]
    data: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "CoinInfo", default)]
    coin_info: RawCoinInfo,
    #[serde(rename = "RAW", default)]
    raw: HashMap<String, RawQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCoinInfo {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "FullName", default)]
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(rename = "PRICE")]
    price: Option<f64>,
    #[serde(rename = "CHANGEPCTHOUR")]
    change_pct_hour: Option<f64>,
    #[serde(rename = "CHANGEPCTDAY")]
    change_pct_day: Option<f64>,
    #[serde(rename = "MKTCAP")]
    market_cap: Option<f64>,
}

impl CryptoCompareProvider {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        CryptoCompareProvider {
            client,
            base_url: base_url.into(),
        }
    }

    fn transform(raw: Vec<RawEntry>, query: &MarketQuery) -> Vec<Coin> {
        let currency_key = query.currency.to_uppercase();
        let mut coins: Vec<Coin> = raw
            .into_iter()
            .map(|e| {
                let quote = e.raw.get(&currency_key);
                Coin {
                    id: e.coin_info.name.to_lowercase(),
                    symbol: e.coin_info.name,
                    name: e.coin_info.full_name,
                    price: quote.and_then(|q| q.price),
                    change_1h: quote.and_then(|q| q.change_pct_hour),
                    change_24h: quote.and_then(|q| q.change_pct_day),
                    market_cap: quote.and_then(|q| q.market_cap),
                }
            })
            .collect();

        if query.has_ids() {
            coins.retain(|c| query.ids.iter().any(|id| *id == c.id));
        }
        coins
    }
}

#[async_trait]
impl MarketProvider for CryptoCompareProvider {
    async fn fetch(&self, query: &MarketQuery) -> Result<Vec<Coin>> {
        let url = format!("{}/data/top/mktcapfull", self.base_url);
        let limit = if query.has_ids() {
            MAX_LIMIT
        } else {
            query.top_n.clamp(1, MAX_LIMIT)
        };
        let params = [
            ("limit", limit.to_string()),
            ("tsym", query.currency.to_uppercase()),
        ];

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let raw: RawTopResponse = resp.json().await.map_err(|e| Error::UnexpectedPayload {
            provider: PROVIDER_NAME.to_string(),
            reason: e.to_string(),
        })?;

        let coins = Self::transform(raw.data, query);
        tracing::info!(count = coins.len(), "CryptoCompare returned market data");
        Ok(coins)
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
