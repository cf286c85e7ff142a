//! shortlink — URL shortener with a buffered telemetry pipeline.
//!
//! Request handling stays simple CRUD; the interesting machinery is the
//! metrics recorder: three bounded queues, three flush workers, and a
//! bulk-copy Postgres sink that can fail or stall without ever touching
//! request latency.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use shortlink_api::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use shortlink_api::{router, AppState, CacheConfig, UrlCache, UrlService};
use shortlink_core::{ShortCodeGenerator, UrlValidator, ValidationConfig};
use shortlink_metrics::{init_tracing_from_env, InfraSampler, Recorder, RecorderConfig};
use shortlink_postgres::{init_schema, DatabaseConfig, PgPool, PostgresMetricSink, UrlRepository};

const INFRA_SAMPLE_PERIOD: Duration = Duration::from_secs(10);

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    /// Public base URL used to build short links
    #[serde(default = "default_base_url")]
    base_url: String,

    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default)]
    metrics: RecorderConfig,
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    rate_limit: RateLimitConfig,
    #[serde(default)]
    validation: ValidationConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
            database: DatabaseConfig::default(),
            metrics: RecorderConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("starting shortlink v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    let pool = PgPool::new(&config.database).context("failed to create postgres pool")?;
    match pool.ping().await {
        Ok(()) => info!("postgres connection: healthy"),
        Err(e) => error!(error = %e, "postgres connection: unhealthy"),
    }

    if let Err(e) = init_schema(&pool).await {
        // Continue anyway - the schema usually already exists
        error!(error = %e, "failed to initialize schema");
    }

    let cache = Arc::new(UrlCache::new(&config.cache));

    // The recorder shares the pool with the request path; a stalled sink
    // only ever costs dropped metrics, never request latency.
    let sink = Arc::new(PostgresMetricSink::new(pool.clone()));
    let recorder = Arc::new(
        Recorder::new(sink, config.metrics.clone()).context("invalid metrics configuration")?,
    );

    let shutdown = CancellationToken::new();
    recorder.start(&shutdown);

    let sampler = InfraSampler::new(
        recorder.clone(),
        Arc::new(pool.clone()),
        cache.clone(),
        INFRA_SAMPLE_PERIOD,
    );
    let _sampler_handle = sampler.spawn(shutdown.clone());

    let store = Arc::new(UrlRepository::new(pool.clone()));
    let shortener = ShortCodeGenerator::new().context("failed to create short code generator")?;
    let service = Arc::new(UrlService::new(
        store,
        shortener,
        cache.clone(),
        config.base_url.trim_end_matches('/'),
        recorder.clone(),
    ));
    let validator = Arc::new(UrlValidator::new(config.validation.clone()));

    let state = AppState::new(
        service,
        validator,
        recorder.clone(),
        RateLimiter::new(config.rate_limit.clone()),
    );
    let _rate_limiter_cleanup = state.start_rate_limiter_cleanup();

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid server address")?;

    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await
    .context("server error")?;

    info!("shutting down");

    // Drain and stop the flush workers before exiting; anything still
    // queued gets one final bounded flush.
    recorder.close().await;

    info!("shutdown complete");
    Ok(())
}

/// Load configuration from defaults, optional file, and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("SHORTLINK")
                .try_parsing(true),
        )
        .build()
        .context("failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("failed to deserialize configuration")?;

    // Platform-style override (most PaaS runtimes inject a bare PORT)
    if let Ok(port) = std::env::var("PORT") {
        if let Ok(port) = port.parse() {
            config.port = port;
        }
    }

    Ok(config)
}

/// Graceful shutdown signal handler. Cancelling the shared token stops the
/// flush workers and the infra sampler alongside the HTTP server.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C signal");
        }
        _ = terminate => {
            info!("received terminate signal");
        }
    }

    shutdown.cancel();
}
