//! Historical price series for the chart mode.

use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Daily price points for one coin, oldest first, as `(unix_millis, price)`.
#[derive(Clone, Debug, Deserialize)]
pub struct PriceHistory {
    #[serde(default)]
    pub prices: Vec<(i64, f64)>,
}

impl PriceHistory {
    pub fn values(&self) -> Vec<f64> {
        self.prices.iter().map(|(_, p)| *p).collect()
    }
}

pub async fn fetch_price_history(
    client: &Client,
    coin_id: &str,
    currency: &str,
    days: u32,
) -> Result<PriceHistory> {
    fetch_from(client, BASE_URL, coin_id, currency, days).await
}

async fn fetch_from(
    client: &Client,
    base_url: &str,
    coin_id: &str,
    currency: &str,
    days: u32,
) -> Result<PriceHistory> {
    let url = format!("{}/coins/{}/market_chart", base_url, coin_id);
    let params = [
        ("vs_currency", currency.to_lowercase()),
        ("days", days.to_string()),
    ];

    let resp = client
        .get(&url)
        .query(&params)
        .send()
        .await?
        .error_for_status()?;

    let history: PriceHistory = resp.json().await.map_err(|e| Error::UnexpectedPayload {
        provider: "CoinGecko".to_string(),
        reason: e.to_string(),
    })?;
    tracing::info!(coin_id, points = history.prices.len(), "Fetched price history");
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_price_pairs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/bitcoin/market_chart"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "prices": [[1700000000000i64, 41000.0], [1700086400000i64, 42500.0]]
            })))
            .mount(&server)
            .await;

        let history = fetch_from(&Client::new(), &server.uri(), "bitcoin", "usd", 7)
            .await
            .unwrap();
        assert_eq!(history.values(), vec![41000.0, 42500.0]);
    }
}
