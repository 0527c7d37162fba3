//! CoinGecko market data provider.
//!
//! Primary source in the fallback order. Supports server-side id filtering
//! through the `ids` query parameter, so no client-side selection is needed.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::market::providers::MarketProvider;
use crate::market::{Coin, MarketQuery};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PROVIDER_NAME: &str = "CoinGecko";

pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RawMarketCoin {
    #[serde(default)]
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    current_price: Option<f64>,
    price_change_percentage_1h_in_currency: Option<f64>,
    price_change_percentage_24h_in_currency: Option<f64>,
    market_cap: Option<f64>,
}

impl CoinGeckoProvider {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        CoinGeckoProvider {
            client,
            base_url: base_url.into(),
        }
    }

    fn transform(raw: Vec<RawMarketCoin>) -> Vec<Coin> {
        raw.into_iter()
            .map(|c| Coin {
                id: c.id,
                symbol: c.symbol,
                name: c.name,
                price: c.current_price,
                change_1h: c.price_change_percentage_1h_in_currency,
                change_24h: c.price_change_percentage_24h_in_currency,
                market_cap: c.market_cap,
            })
            .collect()
    }

    /// Restore the caller's requested id order; ids the API did not return
    /// are dropped.
    fn reorder(coins: Vec<Coin>, ids: &[String]) -> Vec<Coin> {
        let mut by_id: std::collections::HashMap<String, Coin> =
            coins.into_iter().map(|c| (c.id.clone(), c)).collect();
        ids.iter().filter_map(|id| by_id.remove(id)).collect()
    }
}

#[async_trait]
impl MarketProvider for CoinGeckoProvider {
    async fn fetch(&self, query: &MarketQuery) -> Result<Vec<Coin>> {
        let url = format!("{}/coins/markets", self.base_url);
        let per_page = if query.has_ids() {
            query.ids.len().clamp(1, 250)
        } else {
            query.top_n.clamp(1, 250)
        };

        let mut params = vec![
            ("vs_currency", query.currency.clone()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", per_page.to_string()),
            ("page", "1".to_string()),
            ("sparkline", "false".to_string()),
            ("price_change_percentage", "1h,24h".to_string()),
            ("locale", "en".to_string()),
        ];
        if query.has_ids() {
            params.push(("ids", query.ids.join(",")));
        }

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let raw: Vec<RawMarketCoin> =
            resp.json().await.map_err(|e| Error::UnexpectedPayload {
                provider: PROVIDER_NAME.to_string(),
                reason: e.to_string(),
            })?;

        let mut coins = Self::transform(raw);
        if query.has_ids() {
            coins = Self::reorder(coins, &query.ids);
        }
        tracing::info!(count = coins.len(), "CoinGecko returned market data");
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
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn raw(v: serde_json::Value) -> Vec<RawMarketCoin> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn transform_maps_fields_and_tolerates_missing_metrics() {
        let coins = CoinGeckoProvider::transform(raw(json!([
            {
                "id": "bitcoin",
                "symbol": "btc",
                "name": "Bitcoin",
                "current_price": 50000.0,
                "price_change_percentage_1h_in_currency": 0.5,
                "price_change_percentage_24h_in_currency": -1.2,
                "market_cap": 1.0e12
            },
            { "id": "mystery", "symbol": "myst", "name": "Mystery" }
        ])));

        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].id, "bitcoin");
        assert_eq!(coins[0].price, Some(50000.0));
        assert_eq!(coins[0].change_24h, Some(-1.2));
        assert_eq!(coins[1].price, None);
        assert_eq!(coins[1].market_cap, None);
    }

    #[test]
    fn transform_is_idempotent_on_same_payload() {
        let payload = json!([
            { "id": "ethereum", "symbol": "eth", "name": "Ethereum", "current_price": 3000.0 }
        ]);
        let first = CoinGeckoProvider::transform(raw(payload.clone()));
        let second = CoinGeckoProvider::transform(raw(payload));
        assert_eq!(first, second);
    }

    #[test]
    fn reorder_follows_requested_ids_and_drops_unknown() {
        let coins = CoinGeckoProvider::transform(raw(json!([
            { "id": "ethereum", "symbol": "eth", "name": "Ethereum" },
            { "id": "bitcoin", "symbol": "btc", "name": "Bitcoin" }
        ])));
        let ids = vec![
            "bitcoin".to_string(),
            "dogecoin".to_string(),
            "ethereum".to_string(),
        ];
        let ordered = CoinGeckoProvider::reorder(coins, &ids);
        assert_eq!(
            ordered.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["bitcoin", "ethereum"]
        );
    }

    #[tokio::test]
    async fn fetch_parses_markets_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/markets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 42.0 }
            ])))
            .mount(&server)
            .await;

        let provider = CoinGeckoProvider::with_base_url(Client::new(), server.uri());
        let coins = provider
            .fetch(&MarketQuery::top("usd", 10))
            .await
            .unwrap();
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].symbol, "btc");
    }

    #[tokio::test]
    async fn fetch_rejects_non_list_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/markets"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "status": "rate limited" })),
            )
            .mount(&server)
            .await;

        let provider = CoinGeckoProvider::with_base_url(Client::new(), server.uri());
        let err = provider
            .fetch(&MarketQuery::top("usd", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedPayload { .. }));
    }
}
