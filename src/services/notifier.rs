use serde_json::json;

use crate::models::{Alert, Market};

/// Telegram notification service. Failures are logged but never block the main flow.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl Notifier {
    pub fn new(http: reqwest::Client, bot_token: String, chat_id: String) -> Self {
        Self {
            http,
            bot_token,
            chat_id,
        }
    }

    /// Send a Telegram message. Failures are logged as warnings.
    pub async fn send(&self, message: &str) {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );

        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    tracing::warn!(
                        status = %resp.status(),
                        "Telegram sendMessage returned non-2xx"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send Telegram notification");
            }
        }
    }
}

fn short_wallet(wallet: &str) -> String {
    if wallet.len() > 10 {
        format!("{}...{}", &wallet[..6], &wallet[wallet.len() - 4..])
    } else {
        wallet.to_string()
    }
}

/// Format a newly raised alert, strongest factors first.
pub fn format_alert(alert: &Alert, market: &Market) -> String {
    let mut factors: Vec<(&String, &i32)> = alert
        .risk_factors
        .0
        .iter()
        .filter(|(_, points)| **points > 0)
        .collect();
    factors.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    let breakdown = factors
        .iter()
        .map(|(name, points)| format!("{name} +{points}"))
        .collect::<Vec<_>>()
        .join(", ");

    let resolves = market
        .expected_resolution()
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".into());

    format!(
        "*Suspicious Trade* (score {})\nWallet: `{}`\nMarket: {}\nPosition: ${} USDC\nPotential payout: ${}\nResolves: {}\nFactors: {}",
        alert.risk_score,
        short_wallet(&alert.wallet_address),
        market.title,
        alert.position_size.round_dp(2),
        alert.potential_payout.round_dp(2),
        resolves,
        breakdown,
    )
}

/// Format the settlement of a pending alert.
pub fn format_settlement(alert: &Alert) -> String {
    format!(
        "*Alert Settled*: {}\nWallet: `{}`\nMarket: `{}`\nReturn: ${}",
        alert.status.to_uppercase(),
        short_wallet(&alert.wallet_address),
        alert.market_id,
        alert.actual_return.unwrap_or_default().round_dp(2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sqlx::types::Json;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn alert() -> Alert {
        Alert {
            id: Uuid::new_v4(),
            wallet_address: "0x1234567890abcdef".into(),
            market_id: "will-x-happen".into(),
            trade_id: Uuid::new_v4(),
            tx_hash: "0xfeed".into(),
            risk_score: 27,
            risk_factors: Json(BTreeMap::from([
                ("fresh_wallet".to_string(), 5),
                ("time_to_resolution".to_string(), 10),
                ("payout_ratio".to_string(), 0),
            ])),
            position_size: Decimal::new(900_012, 2),
            potential_payout: Decimal::from(15_000),
            market_resolution_date: None,
            status: "won".into(),
            actual_return: Some(Decimal::from(6_000)),
            flagged_at: Utc::now(),
            settled_at: None,
        }
    }

    fn market() -> Market {
        Market {
            market_id: "will-x-happen".into(),
            title: "Will X happen?".into(),
            category: None,
            end_date: None,
            resolution_date: None,
            resolved: false,
            outcome: None,
            total_volume: None,
            holder_count: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_format_alert_orders_factors() {
        let text = format_alert(&alert(), &market());
        assert!(text.contains("score 27"));
        assert!(text.contains("`0x1234...cdef`"));
        assert!(text.contains("time_to_resolution +10, fresh_wallet +5"));
        assert!(!text.contains("payout_ratio"));
        assert!(text.contains("Resolves: unknown"));
    }

    #[test]
    fn test_format_settlement() {
        let text = format_settlement(&alert());
        assert!(text.contains("WON"));
        assert!(text.contains("$6000"));
    }
}
