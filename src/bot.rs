//! Cycle orchestration: fetch, evaluate alerts, format, deliver.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Proxy};

use crate::alerts;
use crate::config::{AppConfig, FetchFailurePolicy};
use crate::error::{Error, Result};
use crate::format::{self, ReportOptions};
use crate::market::fallback::FallbackFetcher;
use crate::market::providers;
use crate::market::{history, sentiment, MarketQuery};
use crate::proxy::ProxyProber;
use crate::scheduler::{Scheduler, StopSignal};
use crate::summary::SummaryClient;
use crate::telegram::TelegramClient;

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);
const CHART_DAYS: u32 = 7;

pub struct Bot {
    config: AppConfig,
    client: Client,
    fetcher: FallbackFetcher,
    telegram: TelegramClient,
    summary: SummaryClient,
}

impl Bot {
    /// Validate credentials, optionally select a proxy, and wire up the
    /// component stack. Fails fast on configuration problems.
    pub async fn new(config: AppConfig) -> Result<Self> {
        config.validate_credentials()?;
        let client = build_http_client(&config).await?;
        let fetcher = FallbackFetcher::new(providers::default_providers(&client));
        let telegram = TelegramClient::new(client.clone(), config.telegram.bot_token.clone());
        let summary = SummaryClient::new(client.clone(), config.summary.clone());
        Ok(Bot {
            config,
            client,
            fetcher,
            telegram,
            summary,
        })
    }

    /// Test seam: assemble a bot from pre-built parts.
    #[cfg(test)]
    fn with_parts(
        config: AppConfig,
        client: Client,
        providers: Vec<Box<dyn providers::MarketProvider>>,
        telegram: TelegramClient,
    ) -> Self {
        let summary = SummaryClient::new(client.clone(), config.summary.clone());
        Bot {
            fetcher: FallbackFetcher::new(providers),
            config,
            client,
            telegram,
            summary,
        }
    }

    fn query(&self) -> MarketQuery {
        let ids = self.config.market.coin_id_list();
        if ids.is_empty() {
            MarketQuery::top(&self.config.market.currency, self.config.market.top_n)
        } else {
            MarketQuery::by_ids(&self.config.market.currency, ids)
        }
    }

    fn report_options(&self) -> ReportOptions {
        ReportOptions {
            include_1h: self.config.market.include_1h,
            include_24h: self.config.market.include_24h,
            include_market_cap: self.config.market.include_market_cap,
        }
    }

    /// One fetch-evaluate-format-deliver cycle.
    pub async fn run_cycle(&self) -> Result<()> {
        let rules = alerts::load_rules(&self.config.alerts.file);

        let result = self.fetcher.fetch(&self.query()).await?;
        tracing::info!(
            provider = %result.provider,
            count = result.coins.len(),
            "Fetched market data"
        );
        let mut coins = result.coins;

        // Alert rules may reference coins outside the report set.
        let missing = alerts::missing_coin_ids(&coins, &rules);
        if !missing.is_empty() {
            let query = MarketQuery::by_ids(&self.config.market.currency, missing);
            match self.fetcher.fetch(&query).await {
                Ok(extra) => coins.extend(extra.coins),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not fetch alert-only coins");
                }
            }
        }

        for notification in alerts::evaluate(&coins, &rules) {
            if let Err(e) = self
                .telegram
                .send_message(&notification.chat_id, &notification.message)
                .await
            {
                tracing::error!(
                    chat_id = %notification.chat_id,
                    error = %e,
                    "Alert notification failed"
                );
            }
        }

        let mut message = format::build_message(
            &coins,
            &self.config.market.currency,
            self.report_options(),
            Utc::now(),
        );
        if let Some(line) = self.ai_one_liner(&coins).await {
            message.push_str("\n\n");
            message.push_str(&line);
        }

        self.telegram
            .send_message(&self.config.telegram.chat_id, &message)
            .await?;
        tracing::info!(
            coins = coins.len(),
            chat_id = %self.config.telegram.chat_id,
            "Posted report"
        );
        Ok(())
    }

    async fn ai_one_liner(&self, coins: &[crate::market::Coin]) -> Option<String> {
        if !self.config.summary.enabled {
            return None;
        }
        let global = sentiment::fetch_global_metrics(&self.client).await;
        let fear_greed = sentiment::fetch_fear_greed_index(&self.client).await;
        self.summary
            .market_one_liner(
                coins,
                global.as_ref(),
                fear_greed.as_ref(),
                &self.config.market.currency,
            )
            .await
    }

    /// Post once and exit; errors propagate to a non-zero exit status.
    pub async fn run_once(&self) -> Result<()> {
        self.run_cycle().await?;
        tracing::info!("Single post complete");
        Ok(())
    }

    pub async fn run_demo(&self) -> Result<()> {
        self.run_cycle().await?;
        tracing::info!("Demo message sent");
        Ok(())
    }

    /// Cron-style entry: exactly one cycle, reported as a status/body pair.
    pub async fn run_cron(&self) -> (u16, String) {
        match self.run_cycle().await {
            Ok(()) => (200, "ok".to_string()),
            Err(e) => (500, e.to_string()),
        }
    }

    /// Fetch one coin's history and post a text chart.
    pub async fn run_chart(&self, coin_id: &str) -> Result<()> {
        let history = history::fetch_price_history(
            &self.client,
            coin_id,
            &self.config.market.currency,
            CHART_DAYS,
        )
        .await?;
        let message = format::build_chart_message(
            coin_id,
            &self.config.market.currency,
            CHART_DAYS,
            &history,
        );
        self.telegram
            .send_message(&self.config.telegram.chat_id, &message)
            .await
    }

    /// Run aligned to interval boundaries until the stop signal is raised.
    pub async fn run_forever(self: Arc<Self>, stop: StopSignal) {
        let scheduler = Scheduler::new(self.config.schedule.interval_minutes, stop.clone());
        let bot = Arc::clone(&self);
        scheduler
            .run(move || {
                let bot = Arc::clone(&bot);
                let stop = stop.clone();
                async move {
                    match bot.run_cycle().await {
                        Ok(()) => Ok(()),
                        Err(e @ Error::AllProvidersFailed)
                            if bot.config.market.on_total_failure == FetchFailurePolicy::Abort =>
                        {
                            tracing::error!("Total fetch failure with abort policy, exiting");
                            stop.raise();
                            Err(e.into())
                        }
                        Err(e) => Err(e.into()),
                    }
                }
            })
            .await;
        tracing::info!("Scheduler stopped");
    }
}

/// Shared HTTP client, optionally routed through the fastest probed proxy.
/// The selection is made once and holds for the lifetime of the process.
async fn build_http_client(config: &AppConfig) -> Result<Client> {
    let mut builder = Client::builder().timeout(HTTP_TIMEOUT);

    if config.proxy.enabled {
        let prober = ProxyProber::new(Client::new(), &config.proxy);
        match prober.select_fastest().await {
            Some(address) => match Proxy::all(format!("http://{}", address)) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid proxy address, using direct access");
                }
            },
            None => tracing::warn!("Proxy probing found nothing, using direct access"),
        }
    }

    builder.build().map_err(Error::Http)
}
