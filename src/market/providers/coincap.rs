//! CoinCap market data provider.
//!
//! `/v2/assets` quotes in USD only and encodes numbers as decimal strings.
//! The API has no 1h change, so it is approximated as one twenty-fourth of
//! the 24h change. Assets arrive rank-ordered already.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::market::providers::MarketProvider;
use crate::market::{Coin, MarketQuery};

const BASE_URL: &str = "https://api.coincap.io/v2";
const PROVIDER_NAME: &str = "CoinCap";

pub struct CoinCapProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RawAssetsResponse {
    #[serde(default)]
    data: Vec<RawAsset>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    #[serde(default)]
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
    #[serde(rename = "changePercent24Hr")]
    change_percent_24h: Option<String>,
    #[serde(rename = "marketCapUsd")]
    market_cap_usd: Option<String>,
}

fn parse_decimal(field: Option<&String>) -> Option<f64> {
    field.and_then(|s| s.parse::<f64>().ok())
}

impl CoinCapProvider {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        CoinCapProvider {
            client,
            base_url: base_url.into(),
        }
    }

    fn transform(mut raw: Vec<RawAsset>, query: &MarketQuery) -> Vec<Coin> {
        if query.has_ids() {
            raw.retain(|a| query.ids.iter().any(|id| *id == a.id));
        } else {
            raw.truncate(query.top_n);
        }

        raw.into_iter()
            .map(|a| {
                let change_24h = parse_decimal(a.change_percent_24h.as_ref());
                Coin {
                    id: a.id,
                    symbol: a.symbol,
                    name: a.name,
                    price: parse_decimal(a.price_usd.as_ref()),
                    change_1h: change_24h.map(|p| p / 24.0),
                    change_24h,
                    market_cap: parse_decimal(a.market_cap_usd.as_ref()),
                }
            })
            .collect()
    }
}

#[async_trait]
impl MarketProvider for CoinCapProvider {
    async fn fetch(&self, query: &MarketQuery) -> Result<Vec<Coin>> {
        let url = format!("{}/assets", self.base_url);
        let resp = self.client.get(&url).send().await?.error_for_status()?;

        let raw: RawAssetsResponse =
            resp.json().await.map_err(|e| Error::UnexpectedPayload {
                provider: PROVIDER_NAME.to_string(),
                reason: e.to_string(),
            })?;

        let coins = Self::transform(raw.data, query);
        tracing::info!(count = coins.len(), "CoinCap returned market data");
        Ok(coins)
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: serde_json::Value) -> Vec<RawAsset> {
        serde_json::from_value(v).unwrap()
    }

    fn sample() -> serde_json::Value {
        json!([
            {
                "id": "bitcoin", "symbol": "BTC", "name": "Bitcoin",
                "priceUsd": "50000.0", "changePercent24Hr": "2.4",
                "marketCapUsd": "1000000000000.0"
            },
            {
                "id": "ethereum", "symbol": "ETH", "name": "Ethereum",
                "priceUsd": "not-a-number"
            }
        ])
    }

    #[test]
    fn decimal_strings_are_parsed_and_bad_values_become_none() {
        let coins = CoinCapProvider::transform(raw(sample()), &MarketQuery::top("usd", 10));
        assert_eq!(coins[0].price, Some(50000.0));
        assert_eq!(coins[0].market_cap, Some(1.0e12));
        assert_eq!(coins[1].price, None);
        assert_eq!(coins[1].change_24h, None);
    }

    #[test]
    fn one_hour_change_is_scaled_down_from_24h() {
        let coins = CoinCapProvider::transform(raw(sample()), &MarketQuery::top("usd", 1));
        assert_eq!(coins[0].change_24h, Some(2.4));
        assert_eq!(coins[0].change_1h, Some(2.4 / 24.0));
    }

    #[test]
    fn explicit_ids_filter_client_side() {
        let query = MarketQuery::by_ids("usd", vec!["ethereum".to_string()]);
        let coins = CoinCapProvider::transform(raw(sample()), &query);
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].id, "ethereum");
    }

    #[test]
    fn top_n_truncates_in_api_order() {
        let coins = CoinCapProvider::transform(raw(sample()), &MarketQuery::top("usd", 1));
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].id, "bitcoin");
    }
}
