//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/top-cryptos` - 시가총액 상위 자산
//! - `/api/crypto/{id}` - 자산 상세
//! - `/api/coins/{id}/market_chart` - 과거 시세
//! - `/api/content/{id}` - 자산 설명 콘텐츠
//! - `/api/glossary` - 용어집
//!
//! 모든 `/api` 라우트는 같은 흐름을 따릅니다:
//! 캐시 키 생성 → 캐시 조회(히트 시 즉시 응답) → 업스트림 호출 → 성공 시 캐시 저장.
//! 실패는 캐시하지 않습니다.

pub mod content;
pub mod health;
pub mod market;

pub use content::content_router;
pub use health::{
    health_router, CacheUsage, ProviderStatus, RateLimitUsage, Readiness, ReadinessReport,
};
pub use market::{market_router, MarketChartQuery};

use std::future::Future;
use std::sync::Arc;

use axum::{Json, Router};
use coinlens_upstream::UpstreamResult;
use serde_json::Value;
use tracing::debug;

use crate::cache::CacheKey;
use crate::error::{ApiError, ApiResult};
use crate::metrics::{record_cache_lookup, record_upstream_call};
use crate::state::AppState;

/// `/api` 라우터 생성 (rate limit 적용 대상).
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new().merge(market_router()).merge(content_router())
}

/// 캐시를 거쳐 JSON 응답을 반환합니다.
///
/// 히트면 저장된 본문을 그대로, 미스면 `fetch` 결과를 저장 후 반환합니다.
/// 같은 키의 동시 미스는 각자 업스트림을 호출합니다.
pub(crate) async fn cached_json<F, Fut>(
    state: &AppState,
    key: CacheKey,
    fetch: F,
) -> ApiResult<Json<Value>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<Value>>,
{
    if let Some(payload) = state.cache.get(&key).await {
        record_cache_lookup(key.route(), true);
        debug!(key = %key, "Cache hit");
        return Ok(Json(payload));
    }

    record_cache_lookup(key.route(), false);
    debug!(key = %key, "Cache miss, fetching from upstream");

    let payload = fetch().await?;
    state.cache.set(key, payload.clone()).await;

    Ok(Json(payload))
}

/// 업스트림 호출 결과를 기록하고 실패를 [`ApiError::Upstream`]으로 변환합니다.
pub(crate) async fn call_upstream<T>(
    state: &AppState,
    provider: &str,
    context: &'static str,
    call: impl Future<Output = UpstreamResult<T>>,
) -> ApiResult<T> {
    match call.await {
        Ok(value) => {
            record_upstream_call(provider, "success");
            Ok(value)
        }
        Err(e) => {
            record_upstream_call(provider, e.kind());
            Err(ApiError::upstream(
                context,
                e,
                state.upstream_status_passthrough,
            ))
        }
    }
}
