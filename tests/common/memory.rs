use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use polywatch::db::{CommitResult, DismissOutcome, Repository, TradeCommit};
use polywatch::intelligence::Settlement;
use polywatch::models::{
    Alert, AlertStatus, Market, MarketMetadata, Position, Trade, TradeEvent, Wallet, Watermark,
};
use polywatch::polymarket::{MarketDataSource, SourceFetchError, TradeBatch};

#[derive(Default)]
struct Tables {
    wallets: HashMap<String, Wallet>,
    markets: HashMap<String, Market>,
    trades: Vec<Trade>,
    positions: HashMap<(String, String), Position>,
    alerts: Vec<Alert>,
    watermark: Option<Watermark>,
    runtime_config: HashMap<String, String>,
    fail_commits: HashSet<String>,
}

/// In-memory [`Repository`] with the same uniqueness and lifecycle rules as Postgres.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    pub commit_calls: AtomicUsize,
}

#[allow(dead_code)]
impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory repository poisoned")
    }

    /// Make the commit of this tx hash fail until cleared.
    pub fn fail_commit_for(&self, tx_hash: &str) {
        self.lock().fail_commits.insert(tx_hash.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().fail_commits.clear();
    }

    pub fn set_runtime_config(&self, key: &str, value: &str) {
        self.lock().runtime_config.insert(key.to_string(), value.to_string());
    }

    pub fn reset_watermark(&self) {
        self.lock().watermark = None;
    }

    pub fn insert_wallet(&self, wallet: Wallet) {
        self.lock().wallets.insert(wallet.address.clone(), wallet);
    }

    pub fn insert_market(&self, market: Market) {
        self.lock().markets.insert(market.market_id.clone(), market);
    }

    pub fn wallet(&self, address: &str) -> Option<Wallet> {
        self.lock().wallets.get(address).cloned()
    }

    pub fn market(&self, market_id: &str) -> Option<Market> {
        self.lock().markets.get(market_id).cloned()
    }

    pub fn position(&self, wallet: &str, market_id: &str) -> Option<Position> {
        self.lock()
            .positions
            .get(&(wallet.to_string(), market_id.to_string()))
            .cloned()
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.lock().trades.clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.lock().alerts.clone()
    }

    pub fn alert(&self, id: Uuid) -> Option<Alert> {
        self.lock().alerts.iter().find(|a| a.id == id).cloned()
    }

    pub fn watermark(&self) -> Option<Watermark> {
        self.lock().watermark.clone()
    }
}

fn advance(current: &mut Option<Watermark>, mark: &Watermark) {
    if current.as_ref().map_or(true, |c| c < mark) {
        *current = Some(mark.clone());
    }
}

fn transition(alert: &mut Alert, status: AlertStatus, actual_return: Option<rust_decimal::Decimal>) -> bool {
    if alert.lifecycle().transition(status).is_err() {
        return false;
    }
    alert.status = status.as_str().to_string();
    alert.actual_return = actual_return;
    alert.settled_at = Some(Utc::now());
    true
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_wallet(&self, address: &str) -> anyhow::Result<Option<Wallet>> {
        Ok(self.lock().wallets.get(address).cloned())
    }

    async fn get_market(&self, market_id: &str) -> anyhow::Result<Option<Market>> {
        Ok(self.lock().markets.get(market_id).cloned())
    }

    async fn save_market(&self, market: &Market) -> anyhow::Result<Market> {
        let mut tables = self.lock();
        let next = match tables.markets.get(&market.market_id) {
            Some(stored) if stored.resolved => Market {
                outcome: market.outcome.clone().or_else(|| stored.outcome.clone()),
                resolution_date: market.resolution_date.or(stored.resolution_date),
                updated_at: Some(Utc::now()),
                ..stored.clone()
            },
            _ => Market {
                updated_at: Some(Utc::now()),
                ..market.clone()
            },
        };
        tables.markets.insert(next.market_id.clone(), next.clone());
        Ok(next)
    }

    async fn get_position(&self, wallet: &str, market_id: &str) -> anyhow::Result<Option<Position>> {
        Ok(self.position(wallet, market_id))
    }

    async fn open_positions(&self, wallet: &str) -> anyhow::Result<Vec<Position>> {
        Ok(self
            .lock()
            .positions
            .values()
            .filter(|p| p.wallet_address == wallet && p.is_open())
            .cloned()
            .collect())
    }

    async fn trade_exists(&self, tx_hash: &str) -> anyhow::Result<bool> {
        Ok(self.lock().trades.iter().any(|t| t.tx_hash == tx_hash))
    }

    async fn count_trades_since(&self, wallet: &str, since: DateTime<Utc>) -> anyhow::Result<i64> {
        Ok(self
            .lock()
            .trades
            .iter()
            .filter(|t| t.wallet_address == wallet && t.traded_at >= since)
            .count() as i64)
    }

    async fn commit_trade(&self, commit: TradeCommit) -> anyhow::Result<CommitResult> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.lock();

        if tables.fail_commits.contains(&commit.trade.tx_hash) {
            anyhow::bail!("injected write failure for {}", commit.trade.tx_hash);
        }
        if tables.trades.iter().any(|t| t.tx_hash == commit.trade.tx_hash) {
            return Ok(CommitResult::Duplicate);
        }

        let mut wallet = commit.wallet;
        if let Some(stored) = tables.wallets.get(&wallet.address) {
            wallet.first_seen_date = wallet.first_seen_date.min(stored.first_seen_date);
        }
        tables.wallets.insert(wallet.address.clone(), wallet);

        let trade = Trade {
            created_at: Some(Utc::now()),
            ..commit.trade
        };
        tables.trades.push(trade.clone());

        if let Some(position) = commit.position {
            let key = (position.wallet_address.clone(), position.market_id.clone());
            let position = match tables.positions.get(&key) {
                Some(stored) => Position {
                    id: stored.id,
                    opened_at: stored.opened_at,
                    ..position
                },
                None => position,
            };
            tables.positions.insert(key, position);
        }

        let alert = match commit.alert {
            Some(alert) if !tables.alerts.iter().any(|a| a.tx_hash == alert.tx_hash) => {
                tables.alerts.push(alert.clone());
                Some(alert)
            }
            _ => None,
        };

        advance(&mut tables.watermark, &commit.watermark);

        Ok(CommitResult::Committed { trade, alert })
    }

    async fn load_watermark(&self) -> anyhow::Result<Option<Watermark>> {
        Ok(self.watermark())
    }

    async fn save_watermark(&self, mark: &Watermark) -> anyhow::Result<()> {
        advance(&mut self.lock().watermark, mark);
        Ok(())
    }

    async fn unresolved_markets_with_pending_alerts(&self) -> anyhow::Result<Vec<Market>> {
        let tables = self.lock();
        let ids: HashSet<&str> = tables
            .alerts
            .iter()
            .filter(|a| a.lifecycle() == AlertStatus::Pending)
            .map(|a| a.market_id.as_str())
            .collect();
        Ok(tables
            .markets
            .values()
            .filter(|m| !m.resolved && ids.contains(m.market_id.as_str()))
            .cloned()
            .collect())
    }

    async fn pending_alerts_for_resolved_markets(&self) -> anyhow::Result<Vec<Alert>> {
        let tables = self.lock();
        Ok(tables
            .alerts
            .iter()
            .filter(|a| a.lifecycle() == AlertStatus::Pending)
            .filter(|a| tables.markets.get(&a.market_id).is_some_and(|m| m.resolved))
            .cloned()
            .collect())
    }

    async fn settle_alert(&self, alert_id: Uuid, settlement: &Settlement) -> anyhow::Result<Option<Alert>> {
        let mut tables = self.lock();
        let Some(alert) = tables.alerts.iter_mut().find(|a| a.id == alert_id) else {
            return Ok(None);
        };
        if !transition(alert, settlement.status, Some(settlement.actual_return)) {
            return Ok(None);
        }
        Ok(Some(alert.clone()))
    }

    async fn dismiss_alert(&self, alert_id: Uuid) -> anyhow::Result<DismissOutcome> {
        let mut tables = self.lock();
        let Some(alert) = tables.alerts.iter_mut().find(|a| a.id == alert_id) else {
            return Ok(DismissOutcome::NotFound);
        };
        if !transition(alert, AlertStatus::Dismissed, None) {
            return Ok(DismissOutcome::AlreadyTerminal(alert.lifecycle()));
        }
        Ok(DismissOutcome::Dismissed(alert.clone()))
    }

    async fn count_pending_alerts(&self) -> anyhow::Result<i64> {
        Ok(self
            .lock()
            .alerts
            .iter()
            .filter(|a| a.lifecycle() == AlertStatus::Pending)
            .count() as i64)
    }

    async fn load_runtime_config(&self) -> anyhow::Result<HashMap<String, String>> {
        Ok(self.lock().runtime_config.clone())
    }
}

/// Market data source serving a fixed feed, with scripted failures and latency.
#[derive(Default)]
pub struct ScriptedSource {
    feed: Mutex<Vec<TradeEvent>>,
    markets: Mutex<HashMap<String, MarketMetadata>>,
    failures: Mutex<VecDeque<SourceFetchError>>,
    delay: Mutex<Option<Duration>>,
    pub fetch_calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new(feed: Vec<TradeEvent>) -> Self {
        Self {
            feed: Mutex::new(feed),
            ..Default::default()
        }
    }

    pub fn push_trade(&self, trade: TradeEvent) {
        self.feed.lock().expect("poisoned").push(trade);
    }

    pub fn set_market(&self, meta: MarketMetadata) {
        self.markets
            .lock()
            .expect("poisoned")
            .insert(meta.market_id.clone(), meta);
    }

    /// The next `n` fetches fail with `error`.
    pub fn fail_next(&self, n: usize, error: SourceFetchError) {
        let mut failures = self.failures.lock().expect("poisoned");
        for _ in 0..n {
            failures.push_back(error.clone());
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("poisoned") = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn fetch_trades(
        &self,
        since: Option<&Watermark>,
        limit: usize,
    ) -> Result<TradeBatch, SourceFetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().expect("poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().expect("poisoned").pop_front();
        if let Some(e) = failure {
            return Err(e);
        }

        let mut trades: Vec<TradeEvent> = self
            .feed
            .lock()
            .expect("poisoned")
            .iter()
            .filter(|t| since.map_or(true, |mark| mark.precedes(t)))
            .cloned()
            .collect();
        polywatch::models::sort_for_processing(&mut trades);
        trades.truncate(limit);

        let known = self.markets.lock().expect("poisoned");
        let markets = trades
            .iter()
            .filter_map(|t| known.get(&t.market_id).map(|m| (t.market_id.clone(), m.clone())))
            .collect();

        Ok(TradeBatch { trades, markets })
    }

    async fn fetch_market(&self, market_id: &str) -> Result<Option<MarketMetadata>, SourceFetchError> {
        Ok(self.markets.lock().expect("poisoned").get(market_id).cloned())
    }
}
