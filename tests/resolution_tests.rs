mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use polywatch::config::DetectionConfig;
use polywatch::db::DismissOutcome;
use polywatch::ingestion::{process_trade, TradeOutcome};
use polywatch::models::{Alert, AlertStatus};
use polywatch::services::{dismiss_alert, run_sweep};

use common::*;

/// Repo holding one pending alert on the niche market, plus a source that knows the market.
async fn flagged() -> (MemoryRepository, ScriptedSource, Alert) {
    let repo = MemoryRepository::new();
    let source = ScriptedSource::new(Vec::new());
    let meta = niche_market(Duration::hours(6));
    source.set_market(meta.clone());
    repo.insert_wallet(wallet_seen(INSIDER, 2));

    let event = buy("0xa1", INSIDER, NICHE_MARKET, 9_000, price(60), Utc::now() - Duration::minutes(1));
    let outcome = process_trade(&repo, &DetectionConfig::default(), &event, Some(&meta), Utc::now())
        .await
        .unwrap();
    let TradeOutcome::Alerted { alert, .. } = outcome else {
        panic!("Expected an alert, got {outcome:?}");
    };
    (repo, source, alert)
}

#[tokio::test]
async fn test_unresolved_market_leaves_alert_pending() {
    let (repo, source, alert) = flagged().await;

    let report = run_sweep(&repo, &source, None).await.unwrap();

    assert_eq!(report.settled, 0);
    assert_eq!(report.newly_resolved, 0);
    assert_eq!(repo.alert(alert.id).unwrap().lifecycle(), AlertStatus::Pending);
}

#[tokio::test]
async fn test_winning_resolution_settles_alert_as_won() {
    let (repo, source, alert) = flagged().await;
    source.set_market(resolved(&niche_market(Duration::hours(6)), "Yes"));

    let report = run_sweep(&repo, &source, None).await.unwrap();

    assert_eq!(report.refreshed, 1);
    assert_eq!(report.newly_resolved, 1);
    assert_eq!(report.settled, 1);

    let settled = repo.alert(alert.id).unwrap();
    assert_eq!(settled.lifecycle(), AlertStatus::Won);
    // 15,000 shares pay $1 each against $9,000 invested
    assert_eq!(settled.actual_return, Some(Decimal::from(6_000)));
    assert!(settled.settled_at.is_some());

    let market = repo.market(NICHE_MARKET).unwrap();
    assert!(market.resolved);
    assert_eq!(market.outcome.as_deref(), Some("Yes"));
}

#[tokio::test]
async fn test_losing_resolution_settles_alert_as_lost() {
    let (repo, source, alert) = flagged().await;
    source.set_market(resolved(&niche_market(Duration::hours(6)), "No"));

    run_sweep(&repo, &source, None).await.unwrap();

    let settled = repo.alert(alert.id).unwrap();
    assert_eq!(settled.lifecycle(), AlertStatus::Lost);
    assert_eq!(settled.actual_return, Some(Decimal::from(-9_000)));
}

#[tokio::test]
async fn test_settled_alert_is_final() {
    let (repo, source, alert) = flagged().await;
    source.set_market(resolved(&niche_market(Duration::hours(6)), "Yes"));
    run_sweep(&repo, &source, None).await.unwrap();

    // A later sweep, even after a reported outcome flip, changes nothing
    source.set_market(resolved(&niche_market(Duration::hours(6)), "No"));
    let report = run_sweep(&repo, &source, None).await.unwrap();
    assert_eq!(report.settled, 0);
    assert_eq!(repo.alert(alert.id).unwrap().lifecycle(), AlertStatus::Won);

    let outcome = dismiss_alert(&repo, alert.id).await.unwrap();
    assert!(matches!(outcome, DismissOutcome::AlreadyTerminal(AlertStatus::Won)));
}

#[tokio::test]
async fn test_dismissed_alert_is_not_settled() {
    let (repo, source, alert) = flagged().await;

    let outcome = dismiss_alert(&repo, alert.id).await.unwrap();
    let DismissOutcome::Dismissed(dismissed) = outcome else {
        panic!("Expected dismissal, got {outcome:?}");
    };
    assert_eq!(dismissed.lifecycle(), AlertStatus::Dismissed);
    assert_eq!(dismissed.actual_return, None);

    source.set_market(resolved(&niche_market(Duration::hours(6)), "Yes"));
    let report = run_sweep(&repo, &source, None).await.unwrap();

    assert_eq!(report.settled, 0);
    assert_eq!(repo.alert(alert.id).unwrap().lifecycle(), AlertStatus::Dismissed);

    let again = dismiss_alert(&repo, alert.id).await.unwrap();
    assert!(matches!(again, DismissOutcome::AlreadyTerminal(AlertStatus::Dismissed)));
}

#[tokio::test]
async fn test_dismiss_unknown_alert() {
    let repo = MemoryRepository::new();
    let outcome = dismiss_alert(&repo, Uuid::new_v4()).await.unwrap();
    assert!(matches!(outcome, DismissOutcome::NotFound));
}

#[tokio::test]
async fn test_market_resolved_through_trade_feed_is_settled() {
    let (repo, source, alert) = flagged().await;

    // Resolution arrives with a later trade's metadata instead of the refresh
    let meta = resolved(&niche_market(Duration::hours(6)), "Yes");
    let event = buy("0xa2", REGULAR, NICHE_MARKET, 10, price(99), Utc::now());
    process_trade(&repo, &DetectionConfig::default(), &event, Some(&meta), Utc::now())
        .await
        .unwrap();

    let report = run_sweep(&repo, &source, None).await.unwrap();

    assert_eq!(report.refreshed, 0);
    assert_eq!(report.settled, 1);
    assert_eq!(repo.alert(alert.id).unwrap().lifecycle(), AlertStatus::Won);
}
