//! Coinlens API 서버.
//!
//! CoinGecko 시세와 Contentful 콘텐츠를 캐싱/rate limiting하는 프록시를 시작합니다.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use coinlens_upstream::{CoinGeckoClient, ContentfulClient};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use coinlens_api::app::{create_app_router, RouterOptions};
use coinlens_api::cache::ResponseCache;
use coinlens_api::config::{ApiConfig, LogFormat};
use coinlens_api::metrics::setup_metrics_recorder;
use coinlens_api::middleware::RateLimiter;
use coinlens_api::openapi::OPENAPI_PATH;
use coinlens_api::state::AppState;

const DEFAULT_LOG_FILTER: &str = "coinlens_api=info,coinlens_upstream=info,tower_http=debug";

/// tracing 초기화.
fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// 설정으로 AppState 생성.
fn create_app_state(config: &ApiConfig) -> anyhow::Result<AppState> {
    let market = CoinGeckoClient::new(config.upstream.coingecko_config())
        .context("failed to create CoinGecko client")?;
    info!(
        base_url = %market.config().base_url,
        timeout_secs = config.upstream.timeout_secs,
        max_retries = config.upstream.max_retries,
        "Market data provider initialized"
    );

    let mut state = AppState::new(
        Arc::new(market),
        ResponseCache::new(config.cache.ttl()),
        RateLimiter::new(config.rate_limit.limiter_config()),
    )
    .with_status_passthrough(config.upstream.status_passthrough);

    match &config.content {
        Some(content) => {
            let client = ContentfulClient::new(content.contentful_config(&config.upstream))
                .context("failed to create Contentful client")?;
            info!(
                space_id = %content.space_id,
                environment = %content.environment,
                "Content provider initialized"
            );
            state = state.with_content(Arc::new(client));
        }
        None => {
            warn!(
                "CONTENTFUL_SPACE_ID / CONTENTFUL_ACCESS_TOKEN not set, \
                 content routes will respond 503"
            );
        }
    }

    Ok(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    init_tracing(LogFormat::from_env());

    info!("Starting Coinlens API server...");

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let addr = config.socket_addr().map_err(|e| {
        error!(
            host = %config.server.host,
            port = config.server.port,
            error = %e,
            "Invalid socket address, check API_HOST and PORT"
        );
        e
    })?;

    let metrics_handle = setup_metrics_recorder().context("failed to install metrics recorder")?;
    info!("Prometheus metrics recorder initialized");

    let state = Arc::new(create_app_state(&config)?);
    info!(
        version = %state.version,
        cache_ttl_secs = config.cache.ttl_secs,
        has_content = state.has_content(),
        "Application state initialized"
    );

    // 전역 종료 토큰 (백그라운드 태스크 종료용)
    let shutdown_token = CancellationToken::new();
    let maintenance = state.start_maintenance(shutdown_token.clone());

    let app = create_app_router(
        state,
        RouterOptions {
            rate_limit_disabled: config.rate_limit.disabled,
            trust_proxy_headers: config.rate_limit.trust_proxy_headers,
            cors_origins: config.server.cors_origins.clone(),
            metrics_handle: Some(metrics_handle),
        },
    );

    info!(%addr, "API server listening");
    info!("OpenAPI document at http://{}{}", addr, OPENAPI_PATH);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
    .await?;

    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();

    if tokio::time::timeout(Duration::from_secs(10), maintenance)
        .await
        .is_err()
    {
        warn!("Cleanup timeout, forcing shutdown");
    }

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    // 모든 백그라운드 태스크에 종료 시그널 전파
    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}
