use serde::{Deserialize, Serialize};

pub mod loader;

/// Top-level application configuration. Every section has usable defaults so
/// an env-only deployment (no config file) works out of the box.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub market: MarketConfig,
    pub schedule: ScheduleConfig,
    pub alerts: AlertsConfig,
    pub proxy: ProxyConfig,
    pub summary: SummaryConfig,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// What to do when every market data provider fails in one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Exit the process with an error.
    Abort,
    /// Log, skip this cycle, retry at the next boundary.
    Skip,
}

impl Default for FetchFailurePolicy {
    fn default() -> Self {
        FetchFailurePolicy::Skip
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Fiat currency code for prices.
    pub currency: String,
    /// Comma-separated explicit coin ids; overrides top-N mode when set.
    pub coin_ids: String,
    /// Number of top coins to show when no explicit ids are given.
    pub top_n: usize,
    pub include_1h: bool,
    pub include_24h: bool,
    pub include_market_cap: bool,
    pub on_total_failure: FetchFailurePolicy,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            currency: "usd".to_string(),
            coin_ids: String::new(),
            top_n: 10,
            include_1h: true,
            include_24h: true,
            include_market_cap: false,
            on_total_failure: FetchFailurePolicy::default(),
        }
    }
}

impl MarketConfig {
    pub fn coin_id_list(&self) -> Vec<String> {
        self.coin_ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minutes between posts when running continuously.
    pub interval_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            interval_minutes: 60,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Path of the JSON alert-rule file, re-read every cycle.
    pub file: String,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        AlertsConfig {
            file: "alerts.json".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub sources: Vec<String>,
    pub probe_url: String,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            enabled: false,
            sources: vec![
                "https://www.proxy-list.download/api/v1/get?type=https".to_string(),
                "https://www.proxyscan.io/download?type=https".to_string(),
            ],
            probe_url: "https://1.1.1.1".to_string(),
            timeout_secs: 5,
            max_concurrency: 20,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub enabled: bool,
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    /// Appended verbatim to the generated prompt.
    pub extra_prompt: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        SummaryConfig {
            enabled: false,
            api_key: String::new(),
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            extra_prompt: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_id_list_splits_and_trims() {
        let market = MarketConfig {
            coin_ids: " bitcoin, ethereum ,,toncoin ".to_string(),
            ..MarketConfig::default()
        };
        assert_eq!(
            market.coin_id_list(),
            vec!["bitcoin", "ethereum", "toncoin"]
        );
        assert!(MarketConfig::default().coin_id_list().is_empty());
    }

    #[test]
    fn failure_policy_parses_lowercase_names() {
        let policy: FetchFailurePolicy = serde_json::from_value(serde_json::json!("abort")).unwrap();
        assert_eq!(policy, FetchFailurePolicy::Abort);
        assert_eq!(FetchFailurePolicy::default(), FetchFailurePolicy::Skip);
    }
}
