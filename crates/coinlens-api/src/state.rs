//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 Axum의 State extractor로 핸들러에 주입됩니다.
//! 전역 싱글턴이 아니므로 테스트마다 독립된 인스턴스를 만들 수 있습니다.

use std::sync::Arc;
use std::time::Duration;

use coinlens_upstream::{ContentProvider, MarketDataProvider};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::middleware::RateLimiter;

/// 정리 작업 최소 주기.
const MIN_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(1);

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 프록시 응답 캐시
    pub cache: ResponseCache,

    /// 클라이언트 IP별 요청 한도
    pub rate_limiter: RateLimiter,

    /// 시세 데이터 제공자 (CoinGecko)
    pub market: Arc<dyn MarketDataProvider>,

    /// 콘텐츠 제공자 (Contentful, 선택)
    pub content: Option<Arc<dyn ContentProvider>>,

    /// 업스트림 상태 코드를 그대로 응답할지 여부 (기본: 항상 500)
    pub upstream_status_passthrough: bool,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        cache: ResponseCache,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            cache,
            rate_limiter,
            market,
            content: None,
            upstream_status_passthrough: false,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 콘텐츠 제공자 설정.
    pub fn with_content(mut self, content: Arc<dyn ContentProvider>) -> Self {
        self.content = Some(content);
        self
    }

    /// 업스트림 상태 코드 전달 설정.
    pub fn with_status_passthrough(mut self, passthrough: bool) -> Self {
        self.upstream_status_passthrough = passthrough;
        self
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }

    /// 만료 캐시 항목과 끝난 rate limit 윈도우를 주기적으로 정리합니다.
    ///
    /// 주기는 캐시 TTL과 rate limit 윈도우 중 짧은 쪽입니다 (최소 1초).
    /// `shutdown`이 취소되면 종료합니다.
    pub fn start_maintenance(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let cache = self.cache.clone();
        let limiter = self.rate_limiter.clone();
        let period = cache
            .ttl()
            .min(limiter.config().window)
            .max(MIN_MAINTENANCE_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = cache.purge_expired().await;
                        limiter.cleanup().await;
                        if purged > 0 {
                            let remaining = cache.len().await;
                            debug!(purged, remaining, "Purged expired cache entries");
                        }
                    }

                    _ = shutdown.cancelled() => {
                        info!("Maintenance task stopped");
                        break;
                    }
                }
            }
        })
    }
}

/// 테스트용 상태 생성.
///
/// 업스트림 호출 시 항상 실패하는 제공자를 사용합니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    use crate::middleware::RateLimitConfig;

    AppState::new(
        Arc::new(test_support::UnreachableMarket),
        ResponseCache::with_defaults(),
        RateLimiter::new(RateLimitConfig::default()),
    )
}

#[cfg(any(test, feature = "test-utils"))]
mod test_support {
    use coinlens_upstream::{MarketDataProvider, UpstreamError, UpstreamResult};
    use serde_json::Value;

    /// 연결 불가 상태를 흉내내는 시세 제공자.
    pub struct UnreachableMarket;

    impl UnreachableMarket {
        fn fail<T>() -> UpstreamResult<T> {
            Err(UpstreamError::NetworkError("upstream unreachable".to_string()))
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for UnreachableMarket {
        fn name(&self) -> &str {
            "unreachable"
        }

        async fn top_assets(&self) -> UpstreamResult<Value> {
            Self::fail()
        }

        async fn asset_detail(&self, _id: &str) -> UpstreamResult<Value> {
            Self::fail()
        }

        async fn market_chart(
            &self,
            _id: &str,
            _vs_currency: Option<&str>,
            _days: Option<&str>,
        ) -> UpstreamResult<Value> {
            Self::fail()
        }
    }
}
