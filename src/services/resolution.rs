use std::collections::HashMap;

use metrics::{counter, gauge};
use uuid::Uuid;

use crate::db::{DismissOutcome, Repository};
use crate::intelligence::settle;
use crate::metrics as m;
use crate::models::Market;
use crate::polymarket::MarketDataSource;
use crate::services::notifier::{format_settlement, Notifier};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Markets whose stored metadata changed on refresh.
    pub refreshed: usize,
    /// Markets that turned resolved during this sweep.
    pub newly_resolved: usize,
    pub settled: usize,
}

/// Refresh markets that pending alerts wait on, then settle every pending
/// alert whose market has resolved.
pub async fn run_sweep(
    repo: &dyn Repository,
    source: &dyn MarketDataSource,
    notifier: Option<&Notifier>,
) -> anyhow::Result<SweepReport> {
    let mut report = SweepReport::default();

    for market in repo.unresolved_markets_with_pending_alerts().await? {
        let meta = match source.fetch_market(&market.market_id).await {
            Ok(Some(meta)) => meta,
            Ok(None) => continue,
            Err(e) => {
                counter!(m::SOURCE_FETCH_FAILURES).increment(1);
                tracing::warn!(market = %market.market_id, error = %e, "Failed to refresh market");
                continue;
            }
        };

        let next = market.merged_with(&meta);
        if next.same_metadata(&market) {
            continue;
        }

        repo.save_market(&next).await?;
        report.refreshed += 1;

        if next.resolved {
            report.newly_resolved += 1;
            tracing::info!(
                market = %next.market_id,
                outcome = ?next.outcome,
                "Market resolved"
            );
        }
    }

    let pending = repo.pending_alerts_for_resolved_markets().await?;
    let mut markets: HashMap<String, Market> = HashMap::new();

    for alert in pending {
        if !markets.contains_key(&alert.market_id) {
            let Some(market) = repo.get_market(&alert.market_id).await? else {
                continue;
            };
            markets.insert(alert.market_id.clone(), market);
        }
        let Some(market) = markets.get(&alert.market_id) else {
            continue;
        };

        let position = repo.get_position(&alert.wallet_address, &alert.market_id).await?;
        let Some(settlement) = settle(&alert, position.as_ref(), market) else {
            continue;
        };

        // None when a dismissal got there first.
        let Some(settled) = repo.settle_alert(alert.id, &settlement).await? else {
            continue;
        };

        report.settled += 1;
        counter!(m::ALERTS_SETTLED).increment(1);
        tracing::info!(
            alert_id = %settled.id,
            wallet = %settled.wallet_address,
            market = %settled.market_id,
            status = %settlement.status,
            actual_return = %settlement.actual_return,
            "Alert settled"
        );

        if let Some(n) = notifier {
            n.send(&format_settlement(&settled)).await;
        }
    }

    match repo.count_pending_alerts().await {
        Ok(n) => gauge!(m::PENDING_ALERTS).set(n as f64),
        Err(e) => tracing::warn!(error = %e, "Failed to count pending alerts"),
    }

    if report.refreshed > 0 || report.settled > 0 {
        tracing::info!(
            refreshed = report.refreshed,
            newly_resolved = report.newly_resolved,
            settled = report.settled,
            "Resolution sweep complete"
        );
    }

    Ok(report)
}

/// Manually dismiss a pending alert.
pub async fn dismiss_alert(repo: &dyn Repository, alert_id: Uuid) -> anyhow::Result<DismissOutcome> {
    let outcome = repo.dismiss_alert(alert_id).await?;

    match &outcome {
        DismissOutcome::Dismissed(alert) => {
            tracing::info!(alert_id = %alert.id, wallet = %alert.wallet_address, "Alert dismissed");
        }
        DismissOutcome::AlreadyTerminal(status) => {
            tracing::debug!(alert_id = %alert_id, status = %status, "Dismiss ignored, alert already terminal");
        }
        DismissOutcome::NotFound => {}
    }

    Ok(outcome)
}
