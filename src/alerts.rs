//! Threshold price alerts.
//!
//! Rules live in a JSON file that is re-read at the start of every cycle, so
//! edits take effect without a restart. Evaluation is stateless: a standing
//! condition re-fires every cycle. No cool-down is implemented on purpose —
//! see DESIGN.md for the open question around repeat notification.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::market::Coin;

/// One persisted threshold rule. Fields are optional at the parse stage so a
/// malformed entry can be skipped individually instead of failing the file.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AlertRule {
    pub coin_id: Option<String>,
    pub threshold: Option<f64>,
    pub direction: Option<String>,
    pub chat_id: Option<String>,
}

/// A triggered alert, ready for delivery.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub chat_id: String,
    pub message: String,
}

/// Load rules from the alert file. A missing file is an empty rule set; a
/// malformed file is logged and also yields an empty set. Never fatal.
pub fn load_rules(path: impl AsRef<Path>) -> Vec<AlertRule> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Could not read alert file");
            return Vec::new();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Could not parse alert file");
            Vec::new()
        }
    }
}

/// Compare current prices against the rules and collect triggered
/// notifications. Invalid rules are skipped with a warning.
pub fn evaluate(coins: &[Coin], rules: &[AlertRule]) -> Vec<Notification> {
    let mut notifications = Vec::new();

    for rule in rules {
        let (coin_id, threshold, direction, chat_id) = match (
            rule.coin_id.as_deref(),
            rule.threshold,
            rule.direction.as_deref(),
            rule.chat_id.as_deref(),
        ) {
            (Some(coin_id), Some(threshold), Some(direction), Some(chat_id))
                if !coin_id.is_empty() && !chat_id.is_empty() =>
            {
                (coin_id, threshold, direction, chat_id)
            }
            _ => {
                tracing::warn!(?rule, "Skipping invalid alert rule");
                continue;
            }
        };

        let Some(coin) = coins.iter().find(|c| c.id == coin_id) else {
            continue;
        };
        let Some(price) = coin.price else {
            continue;
        };

        let message = match direction {
            "above" if price > threshold => format!(
                "🚨 <b>Price Alert</b> 🚨\n\n<b>{}</b> has crossed <b>${}</b> and is now at <b>${}</b>!",
                coin.name, threshold, price
            ),
            "below" if price < threshold => format!(
                "🚨 <b>Price Alert</b> 🚨\n\n<b>{}</b> has dropped below <b>${}</b> and is now at <b>${}</b>!",
                coin.name, threshold, price
            ),
            "above" | "below" => continue,
            other => {
                tracing::warn!(direction = other, "Skipping alert rule with unknown direction");
                continue;
            }
        };

        notifications.push(Notification {
            chat_id: chat_id.to_string(),
            message,
        });
    }

    notifications
}

/// Ids referenced by rules but absent from the fetched set; these get a
/// follow-up fetch before evaluation so alerts work on unlisted coins.
pub fn missing_coin_ids(coins: &[Coin], rules: &[AlertRule]) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for rule in rules {
        let Some(coin_id) = rule.coin_id.as_deref() else {
            continue;
        };
        if coin_id.is_empty() || coins.iter().any(|c| c.id == coin_id) {
            continue;
        }
        if !missing.iter().any(|id| id == coin_id) {
            missing.push(coin_id.to_string());
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(id: &str, name: &str, price: Option<f64>) -> Coin {
        Coin {
            id: id.to_string(),
            symbol: id.to_uppercase(),
            name: name.to_string(),
            price,
            change_1h: None,
            change_24h: None,
            market_cap: None,
        }
    }

    fn rule(coin_id: &str, threshold: f64, direction: &str, chat_id: &str) -> AlertRule {
        AlertRule {
            coin_id: Some(coin_id.to_string()),
            threshold: Some(threshold),
            direction: Some(direction.to_string()),
            chat_id: Some(chat_id.to_string()),
        }
    }

    #[test]
    fn above_rule_fires_once_and_names_the_price() {
        let coins = vec![coin("bitcoin", "Bitcoin", Some(50000.0))];
        let rules = vec![rule("bitcoin", 45000.0, "above", "X")];
        let notifications = evaluate(&coins, &rules);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].chat_id, "X");
        assert!(notifications[0].message.contains("50000"));
        assert!(notifications[0].message.contains("Bitcoin"));
    }

    #[test]
    fn above_rule_stays_quiet_below_threshold() {
        let coins = vec![coin("bitcoin", "Bitcoin", Some(40000.0))];
        let rules = vec![rule("bitcoin", 45000.0, "above", "X")];
        assert!(evaluate(&coins, &rules).is_empty());
    }

    #[test]
    fn below_rule_fires_under_threshold() {
        let coins = vec![coin("ethereum", "Ethereum", Some(2500.0))];
        let rules = vec![rule("ethereum", 3000.0, "below", "Y")];
        let notifications = evaluate(&coins, &rules);
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].message.contains("dropped below"));
    }

    #[test]
    fn invalid_rules_are_skipped_without_aborting_the_rest() {
        let coins = vec![coin("bitcoin", "Bitcoin", Some(50000.0))];
        let rules = vec![
            AlertRule {
                coin_id: Some("bitcoin".to_string()),
                threshold: None,
                direction: Some("above".to_string()),
                chat_id: Some("X".to_string()),
            },
            rule("bitcoin", 45000.0, "sideways", "X"),
            rule("bitcoin", 45000.0, "above", "X"),
        ];
        let notifications = evaluate(&coins, &rules);
        assert_eq!(notifications.len(), 1);
    }

    #[test]
    fn coins_without_price_never_trigger() {
        let coins = vec![coin("bitcoin", "Bitcoin", None)];
        let rules = vec![rule("bitcoin", 45000.0, "above", "X")];
        assert!(evaluate(&coins, &rules).is_empty());
    }

    #[test]
    fn missing_ids_are_collected_once() {
        let coins = vec![coin("bitcoin", "Bitcoin", Some(50000.0))];
        let rules = vec![
            rule("toncoin", 5.0, "above", "X"),
            rule("toncoin", 4.0, "below", "X"),
            rule("bitcoin", 45000.0, "above", "X"),
        ];
        assert_eq!(missing_coin_ids(&coins, &rules), vec!["toncoin"]);
    }

    #[test]
    fn missing_file_is_an_empty_rule_set() {
        assert!(load_rules("definitely-not-here.json").is_empty());
    }

    #[test]
    fn malformed_file_is_an_empty_rule_set() {
        let path = std::env::temp_dir().join(format!(
            "coinpulse-bad-alerts-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{ this is not json").unwrap();
        let rules = load_rules(&path);
        std::fs::remove_file(&path).ok();
        assert!(rules.is_empty());
    }
}
