//! Report text construction for Telegram delivery.

use chrono::{DateTime, Utc};

use crate::market::history::PriceHistory;
use crate::market::Coin;

const SPARKLINE_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARKLINE_WIDTH: usize = 32;

/// Which optional segments each coin line carries.
#[derive(Clone, Copy, Debug)]
pub struct ReportOptions {
    pub include_1h: bool,
    pub include_24h: bool,
    pub include_market_cap: bool,
}

/// Magnitude-dependent precision: whole units above 1000, down to six
/// decimals for sub-cent coins.
pub fn format_price(value: Option<f64>) -> String {
    let Some(v) = value else {
        return "?".to_string();
    };
    if v >= 1000.0 {
        group_thousands(&format!("{:.0}", v))
    } else if v >= 1.0 {
        format!("{:.2}", v)
    } else if v >= 0.01 {
        format!("{:.4}", v)
    } else {
        format!("{:.6}", v)
    }
}

pub fn format_pct(value: Option<f64>) -> String {
    let Some(p) = value else {
        return "?%".to_string();
    };
    let arrow = if p > 0.0 {
        "▲"
    } else if p < 0.0 {
        "▼"
    } else {
        ""
    };
    let sign = if p > 0.0 { "+" } else { "" };
    format!("{}{}{:.2}%", arrow, sign, p)
}

/// The per-cycle report: a timestamped header and one line per coin.
pub fn build_message(
    coins: &[Coin],
    currency: &str,
    options: ReportOptions,
    now: DateTime<Utc>,
) -> String {
    let mut lines = vec![format!(
        "Crypto Prices ({}) — {} UTC\n",
        currency.to_uppercase(),
        now.format("%Y-%m-%d %H:%M")
    )];

    for coin in coins {
        let mut parts = vec![format!(
            "{} ${}",
            coin.symbol.to_uppercase(),
            format_price(coin.price)
        )];

        let mut changes = Vec::new();
        if options.include_1h {
            changes.push(format!("1h: {}", format_pct(coin.change_1h)));
        }
        if options.include_24h {
            changes.push(format!("24h: {}", format_pct(coin.change_24h)));
        }
        if !changes.is_empty() {
            parts.push(changes.join(" | "));
        }
        if options.include_market_cap {
            if let Some(mcap) = coin.market_cap {
                parts.push(format!("MC: ${}", format_price(Some(mcap))));
            }
        }

        lines.push(parts.join(" "));
    }

    lines.join("\n")
}

/// Text chart for one coin: a sparkline of the period plus low/high/last and
/// the period change.
pub fn build_chart_message(
    coin_id: &str,
    currency: &str,
    days: u32,
    history: &PriceHistory,
) -> String {
    let values = history.values();
    if values.is_empty() {
        return format!("No price history available for {}.", coin_id);
    }

    let first = values[0];
    let last = values[values.len() - 1];
    let low = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let high = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let change = if first != 0.0 {
        Some((last - first) / first * 100.0)
    } else {
        None
    };

    format!(
        "<b>{}</b> — last {} days ({})\n<code>{}</code>\nlow ${}  high ${}  now ${}  {}",
        coin_id,
        days,
        currency.to_uppercase(),
        sparkline(&values),
        format_price(Some(low)),
        format_price(Some(high)),
        format_price(Some(last)),
        format_pct(change),
    )
}

fn sparkline(values: &[f64]) -> String {
    let sampled = resample(values, SPARKLINE_WIDTH);
    let low = sampled.iter().cloned().fold(f64::INFINITY, f64::min);
    let high = sampled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = high - low;

    sampled
        .iter()
        .map(|v| {
            let bucket = if span > 0.0 {
                (((v - low) / span) * (SPARKLINE_GLYPHS.len() - 1) as f64).round() as usize
            } else {
                0
            };
            SPARKLINE_GLYPHS[bucket.min(SPARKLINE_GLYPHS.len() - 1)]
        })
        .collect()
}

fn resample(values: &[f64], width: usize) -> Vec<f64> {
    if values.len() <= width {
        return values.to_vec();
    }
    (0..width)
        .map(|i| values[i * (values.len() - 1) / (width - 1)])
        .collect()
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let chars: Vec<char> = digits.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}
