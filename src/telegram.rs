//! Telegram delivery transport.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};

const BASE_URL: &str = "https://api.telegram.org";

pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    ok: bool,
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(client: Client, token: impl Into<String>) -> Self {
        Self::with_base_url(client, token, BASE_URL)
    }

    pub fn with_base_url(
        client: Client,
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        TelegramClient {
            client,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Post an HTML-formatted message. The Bot API reports errors inside a
    /// 200 body as `ok: false`, so the body is inspected, not just the
    /// status line.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let resp = self.client.post(&url).json(&payload).send().await?;
        let status = resp.status();
        match resp.json::<ApiResponse>().await {
            Ok(api) if api.ok => {
                tracing::info!(chat_id, "Telegram message sent");
                Ok(())
            }
            Ok(api) => Err(Error::Telegram(
                api.description
                    .unwrap_or_else(|| format!("request rejected with status {}", status)),
            )),
            // Non-JSON body: fall back to the HTTP status.
            Err(_) if status.is_success() => Ok(()),
            Err(_) => Err(Error::Telegram(format!(
                "request failed with status {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn ok_response_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": "-100", "parse_mode": "HTML" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;

        let client = TelegramClient::with_base_url(Client::new(), "123:abc", server.uri());
        assert!(client.send_message("-100", "hello").await.is_ok());
    }

    #[tokio::test]
    async fn api_level_rejection_surfaces_the_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::with_base_url(Client::new(), "123:abc", server.uri());
        let err = client.send_message("-100", "hello").await.unwrap_err();
        match err {
            Error::Telegram(description) => assert!(description.contains("chat not found")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
