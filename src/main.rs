use std::sync::Arc;
use std::time::Duration;

use polywatch::api::router::create_router;
use polywatch::config::AppConfig;
use polywatch::db::{self, PgRepository, Repository};
use polywatch::ingestion::{Collector, CollectorSettings};
use polywatch::polymarket::{DataClient, GammaClient, MarketDataSource, PolymarketSource};
use polywatch::services::Notifier;
use polywatch::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = polywatch::metrics::init_metrics()?;

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database connected, migrations applied");

    let repo: Arc<dyn Repository> = Arc::new(PgRepository::new(pool.clone()));

    // --- Market data source: Data API trades + Gamma metadata ---
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .user_agent(concat!("polywatch/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let source: Arc<dyn MarketDataSource> = Arc::new(PolymarketSource::new(
        DataClient::new(http.clone(), config.data_api_url.clone()),
        GammaClient::new(http.clone(), config.gamma_api_url.clone()),
        config.source_max_pages,
    ));

    let notifier = match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat)) if config.has_notifier() => {
            tracing::info!("Telegram notifications enabled");
            Some(Notifier::new(http.clone(), token.clone(), chat.clone()))
        }
        _ => {
            tracing::info!("Telegram notifications disabled");
            None
        }
    };

    // --- Collector loop: fetch → classify → track → score → alert ---
    let collector = Arc::new(Collector::new(
        repo.clone(),
        source,
        notifier,
        CollectorSettings::from_config(&config),
        config.detection.clone(),
    ));

    tracing::info!(
        threshold = config.detection.suspicious_threshold,
        interval_secs = config.detection.collection_interval_secs,
        fetch_limit = config.detection.trades_fetch_limit,
        "Spawning collector"
    );
    tokio::spawn(collector.run());

    // --- Read API ---
    let state = AppState {
        db: pool,
        repo,
        config,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
