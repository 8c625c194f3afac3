use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tokio::time::{sleep, timeout, Instant};

use super::pipeline::{process_trade, TradeOutcome};
use crate::config::{AppConfig, DetectionConfig};
use crate::db::Repository;
use crate::errors::IngestError;
use crate::metrics as m;
use crate::models::Watermark;
use crate::polymarket::{MarketDataSource, SourceFetchError, TradeBatch};
use crate::services::notifier::{format_alert, Notifier};
use crate::services::resolution;

const BASE_RETRY_DELAY: Duration = Duration::from_secs(2);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Timing knobs of the collector that are fixed at startup.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Per-attempt bound on a source fetch.
    pub fetch_timeout: Duration,
    /// Retries after the first failed fetch.
    pub max_retries: u32,
    pub base_retry_delay: Duration,
    pub max_retry_delay: Duration,
    /// Wall-clock budget of one cycle.
    pub cycle_timeout: Duration,
}

impl CollectorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            max_retries: config.fetch_max_retries,
            base_retry_delay: BASE_RETRY_DELAY,
            max_retry_delay: MAX_RETRY_DELAY,
            cycle_timeout: Duration::from_secs(config.cycle_timeout_secs),
        }
    }
}

/// Counts for one collector cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub processed: usize,
    pub alerted: usize,
    pub quarantined: usize,
    pub duplicates: usize,
    /// Trade that failed to persist; it and everything after it wait for the next cycle.
    pub failed_at: Option<String>,
    /// The cycle budget ran out before the batch was done.
    pub timed_out: bool,
}

/// Clears the in-progress flag when a cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodic pull from the market data source into the detection pipeline.
pub struct Collector {
    repo: Arc<dyn Repository>,
    source: Arc<dyn MarketDataSource>,
    notifier: Option<Notifier>,
    settings: CollectorSettings,
    base_config: DetectionConfig,
    active_config: RwLock<DetectionConfig>,
    running: AtomicBool,
}

impl Collector {
    pub fn new(
        repo: Arc<dyn Repository>,
        source: Arc<dyn MarketDataSource>,
        notifier: Option<Notifier>,
        settings: CollectorSettings,
        config: DetectionConfig,
    ) -> Self {
        Self {
            repo,
            source,
            notifier,
            settings,
            active_config: RwLock::new(config.clone()),
            base_config: config,
            running: AtomicBool::new(false),
        }
    }

    /// Detection settings in effect for the most recent cycle.
    pub fn active_config(&self) -> DetectionConfig {
        match self.active_config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_active_config(&self, config: DetectionConfig) {
        match self.active_config.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
    }

    /// Overlay `runtime_config` on the startup configuration. On any problem the
    /// previous configuration stays in effect.
    pub async fn reload_config(&self) -> DetectionConfig {
        let current = self.active_config();

        let overrides = match self.repo.load_runtime_config().await {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load runtime config, keeping current settings");
                return current;
            }
        };

        match self.base_config.with_overrides(&overrides) {
            Ok(next) => {
                if next != current {
                    tracing::info!(
                        threshold = next.suspicious_threshold,
                        fresh_days = next.fresh_wallet_days,
                        fresh_max_txs = next.fresh_wallet_max_txs,
                        interval_secs = next.collection_interval_secs,
                        fetch_limit = next.trades_fetch_limit,
                        "Detection config reloaded"
                    );
                    self.set_active_config(next.clone());
                }
                next
            }
            Err(e) => {
                tracing::warn!(error = %e, "Invalid runtime config override, keeping current settings");
                current
            }
        }
    }

    /// Run cycles forever, sleeping the configured interval in between.
    pub async fn run(self: Arc<Self>) {
        tracing::info!(
            interval_secs = self.base_config.collection_interval_secs,
            "Collector started"
        );

        loop {
            match self.run_cycle().await {
                Ok(Some(report)) => {
                    tracing::info!(
                        fetched = report.fetched,
                        processed = report.processed,
                        alerted = report.alerted,
                        quarantined = report.quarantined,
                        duplicates = report.duplicates,
                        timed_out = report.timed_out,
                        "Collector cycle complete"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Collector cycle aborted");
                }
            }

            if let Err(e) =
                resolution::run_sweep(self.repo.as_ref(), self.source.as_ref(), self.notifier.as_ref()).await
            {
                tracing::error!(error = %e, "Resolution sweep failed");
            }

            sleep(self.active_config().collection_interval()).await;
        }
    }

    /// One cycle: reload config, fetch everything after the watermark, and push
    /// each trade through the pipeline in order. Returns `None` if another
    /// cycle is still running.
    pub async fn run_cycle(&self) -> Result<Option<CycleReport>, IngestError> {
        let Some(_guard) = CycleGuard::acquire(&self.running) else {
            tracing::warn!("Previous collector cycle still running, skipping");
            return Ok(None);
        };

        counter!(m::COLLECTOR_CYCLES).increment(1);

        let config = self.reload_config().await;
        let deadline = Instant::now() + self.settings.cycle_timeout;
        let as_of = Utc::now();

        let watermark = self.repo.load_watermark().await.map_err(IngestError::Persistence)?;

        let batch = match timeout(
            deadline.saturating_duration_since(Instant::now()),
            self.fetch_with_backoff(watermark.as_ref(), config.trades_fetch_limit as usize),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(SourceFetchError::Timeout("cycle budget spent while fetching".into()).into());
            }
        };

        let mut report = CycleReport {
            fetched: batch.trades.len(),
            ..Default::default()
        };

        for (index, event) in batch.trades.iter().enumerate() {
            // Checked between trades only: a trade's unit of work is never interrupted.
            if Instant::now() >= deadline {
                tracing::warn!(
                    remaining = report.fetched - index,
                    "Cycle budget spent, deferring the rest of the batch"
                );
                report.timed_out = true;
                break;
            }

            let outcome = process_trade(
                self.repo.as_ref(),
                &config,
                event,
                batch.markets.get(&event.market_id),
                as_of,
            )
            .await;

            match outcome {
                Ok(TradeOutcome::Processed { .. }) => report.processed += 1,
                Ok(TradeOutcome::Quarantined { .. }) => report.quarantined += 1,
                Ok(TradeOutcome::Alerted { alert, market, .. }) => {
                    report.alerted += 1;
                    if let Some(n) = &self.notifier {
                        n.send(&format_alert(&alert, &market)).await;
                    }
                }
                Ok(TradeOutcome::Duplicate) => {
                    report.duplicates += 1;
                    if let Err(e) = self.repo.save_watermark(&event.cursor()).await {
                        tracing::error!(tx = %event.tx_hash, error = %e, "Failed to advance watermark");
                        report.failed_at = Some(event.tx_hash.clone());
                        break;
                    }
                }
                Err(e) if e.is_retryable() => {
                    tracing::error!(
                        tx = %event.tx_hash,
                        wallet = %event.wallet,
                        error = %e,
                        "Trade processing failed, will retry next cycle"
                    );
                    report.failed_at = Some(event.tx_hash.clone());
                    break;
                }
                Err(e) => {
                    tracing::warn!(tx = %event.tx_hash, error = %e, "Trade skipped");
                }
            }
        }

        Ok(Some(report))
    }

    /// Fetch with bounded exponential backoff between attempts.
    pub async fn fetch_with_backoff(
        &self,
        since: Option<&Watermark>,
        limit: usize,
    ) -> Result<TradeBatch, SourceFetchError> {
        let mut attempt: u32 = 0;

        loop {
            let result = match timeout(self.settings.fetch_timeout, self.source.fetch_trades(since, limit)).await {
                Ok(result) => result,
                Err(_) => Err(SourceFetchError::Timeout(format!(
                    "no response within {}s",
                    self.settings.fetch_timeout.as_secs()
                ))),
            };

            let err = match result {
                Ok(batch) => return Ok(batch),
                Err(e) => e,
            };

            counter!(m::SOURCE_FETCH_FAILURES).increment(1);

            if attempt >= self.settings.max_retries {
                tracing::error!(attempts = attempt + 1, error = %err, "Source fetch failed, giving up");
                return Err(err);
            }

            let delay = self.settings.base_retry_delay * 2u32.saturating_pow(attempt);
            let delay = delay.min(self.settings.max_retry_delay);
            attempt = attempt.saturating_add(1);
            tracing::warn!(
                delay_ms = delay.as_millis() as u64,
                attempt,
                error = %err,
                "Source fetch failed, retrying"
            );
            sleep(delay).await;
        }
    }
}
