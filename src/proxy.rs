//! Proxy discovery and latency probing.
//!
//! Candidate `host:port` addresses are scraped from public list sources,
//! de-duplicated, and probed concurrently through a bounded worker pool.
//! The lowest-latency responder wins; if nothing answers the bot falls back
//! to direct network access. Purely a best-effort optimization: every
//! failure path here degrades to "no proxy", never to an error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Proxy};
use tokio::sync::Semaphore;

use crate::config::ProxyConfig;

/// A probed candidate. Unreachable proxies carry `f64::INFINITY`.
#[derive(Clone, Debug)]
pub struct ProxyCandidate {
    pub address: String,
    pub latency: f64,
}

pub struct ProxyProber {
    client: Client,
    sources: Vec<String>,
    probe_url: String,
    timeout: Duration,
    max_concurrency: usize,
}

impl ProxyProber {
    pub fn new(client: Client, config: &ProxyConfig) -> Self {
        ProxyProber {
            client,
            sources: config.sources.clone(),
            probe_url: config.probe_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_concurrency: config.max_concurrency,
        }
    }

    /// Probe all discovered candidates and return the fastest reachable one.
    pub async fn select_fastest(&self) -> Option<String> {
        let candidates = self.fetch_candidates().await;
        if candidates.is_empty() {
            tracing::warn!("No proxy candidates discovered");
            return None;
        }
        tracing::info!(count = candidates.len(), "Probing proxy candidates");

        let probed = self.probe_all(candidates).await;
        match fastest(&probed) {
            Some(winner) => {
                tracing::info!(
                    address = %winner.address,
                    latency_secs = winner.latency,
                    "Selected fastest proxy"
                );
                Some(winner.address.clone())
            }
            None => {
                tracing::warn!("No reachable proxy, using direct access");
                None
            }
        }
    }

    /// Scrape candidate lists. A failing source contributes nothing.
    async fn fetch_candidates(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for source in &self.sources {
            match self.fetch_source(source).await {
                Ok(text) => {
                    for address in parse_proxy_list(&text) {
                        if seen.insert(address.clone()) {
                            candidates.push(address);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "Failed to fetch proxy list");
                }
            }
        }
        candidates
    }

    async fn fetch_source(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    async fn probe_all(&self, candidates: Vec<String>) -> Vec<ProxyCandidate> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut handles = Vec::with_capacity(candidates.len());

        for address in candidates {
            let semaphore = Arc::clone(&semaphore);
            let probe_url = self.probe_url.clone();
            let timeout = self.timeout;
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ProxyCandidate {
                            address,
                            latency: f64::INFINITY,
                        }
                    }
                };
                let latency = probe_one(&probe_url, timeout, &address).await;
                tracing::debug!(address = %address, latency, "Probed proxy");
                ProxyCandidate { address, latency }
            }));
        }

        let mut probed = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(candidate) = handle.await {
                probed.push(candidate);
            }
        }
        probed
    }
}

/// One bounded-timeout request through the candidate. Any failure, including
/// a non-success status, counts as unreachable.
async fn probe_one(probe_url: &str, timeout: Duration, address: &str) -> f64 {
    let proxy = match Proxy::all(format!("http://{}", address)) {
        Ok(proxy) => proxy,
        Err(_) => return f64::INFINITY,
    };
    let client = match Client::builder().proxy(proxy).timeout(timeout).build() {
        Ok(client) => client,
        Err(_) => return f64::INFINITY,
    };

    let start = Instant::now();
    match client.get(probe_url).send().await {
        Ok(resp) if resp.status().is_success() => start.elapsed().as_secs_f64(),
        _ => f64::INFINITY,
    }
}

/// Lowest finite latency wins; all-unreachable means no selection.
pub fn fastest(candidates: &[ProxyCandidate]) -> Option<&ProxyCandidate> {
    candidates
        .iter()
        .filter(|c| c.latency.is_finite())
        .min_by(|a, b| a.latency.total_cmp(&b.latency))
}

fn parse_proxy_list(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}
