mod error;
mod handlers;
mod metrics;
mod rate_limit;
mod routes;

use anyhow::Context;
use dojo_common::catalog::ChallengeCatalog;
use dojo_common::config::{Config, LogFormat};
use dojo_grader::{ExecutionEngine, LanguageConfigManager, PistonEngine};
use rate_limit::{RateLimitConfig, RateLimiter};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

const RATE_LIMIT_EVICTION_INTERVAL: Duration = Duration::from_secs(300);

pub struct AppState {
    pub engine: Arc<dyn ExecutionEngine>,
    pub catalog: ChallengeCatalog,
    /// Attempt persistence; `None` when REDIS_URL is unset
    pub redis: Option<ConnectionManager>,
    pub rate_limiter: Arc<RateLimiter>,
    pub grading_timeout: Duration,
    pub max_parallel_tests: usize,
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    info!("Dojo API booting...");

    let runtimes = LanguageConfigManager::load_or_default(&config.languages_path)?;
    for (language, selector) in runtimes.list_languages() {
        info!(language = %language, runtime = %selector.language, version = %selector.version, "Runtime configured");
    }

    let catalog = ChallengeCatalog::load_from_file(&config.challenges_path)
        .with_context(|| format!("Failed to load challenges from {}", config.challenges_path.display()))?;
    info!(challenges = catalog.len(), "Challenge catalog loaded");

    let engine = PistonEngine::new(&config.piston_url, runtimes, config.execution_timeout)?;
    info!("Execution service: {}", engine.execute_url());

    let redis = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Failed to create Redis client")?;
            let conn = ConnectionManager::new(client)
                .await
                .context("Failed to connect to Redis")?;
            info!("Connected to Redis: {}", url);
            Some(conn)
        }
        None => {
            warn!("REDIS_URL not set, attempts will not be persisted");
            None
        }
    };

    let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        max_requests: config.rate_limit_max_requests,
        window: config.rate_limit_window,
    }));
    rate_limiter.clone().spawn_eviction(RATE_LIMIT_EVICTION_INTERVAL);

    let state = Arc::new(AppState {
        engine: Arc::new(engine),
        catalog,
        redis,
        rate_limiter,
        grading_timeout: config.grading_timeout,
        max_parallel_tests: config.max_parallel_tests,
    });

    let app = routes::app(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("HTTP server listening on {}", config.bind_addr);
    info!("Ready to grade submissions");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("API shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    warn!("Received shutdown signal, draining in-flight requests...");
}
