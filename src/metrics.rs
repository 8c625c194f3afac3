use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const TRADES_INGESTED: &str = "trades_ingested_total";
pub const DUPLICATE_TRADES: &str = "duplicate_trades_total";
pub const QUARANTINED_TRADES: &str = "quarantined_trades_total";
pub const ALERTS_CREATED: &str = "alerts_created_total";
pub const ALERTS_SETTLED: &str = "alerts_settled_total";
pub const COLLECTOR_CYCLES: &str = "collector_cycles_total";
pub const SOURCE_FETCH_FAILURES: &str = "source_fetch_failures_total";
pub const PENDING_ALERTS: &str = "pending_alerts";
pub const PIPELINE_LATENCY: &str = "pipeline_latency_seconds";

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    for name in [
        TRADES_INGESTED,
        DUPLICATE_TRADES,
        QUARANTINED_TRADES,
        ALERTS_CREATED,
        ALERTS_SETTLED,
        COLLECTOR_CYCLES,
        SOURCE_FETCH_FAILURES,
    ] {
        counter!(name).absolute(0);
    }

    gauge!(PENDING_ALERTS).set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!(PIPELINE_LATENCY).record(0.0);

    Ok(handle)
}
