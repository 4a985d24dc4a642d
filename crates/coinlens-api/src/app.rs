//! 전체 라우터 조립.
//!
//! 레이어 순서 (바깥쪽부터): CORS → Trace → 메트릭 → 패닉 처리 → 라우트.
//! Rate limit은 `/api` 라우트에만 적용됩니다.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{not_found_fallback, panic_response};
use crate::middleware::{metrics_layer, rate_limit_middleware, RateLimitState};
use crate::openapi::openapi_router;
use crate::routes::{create_api_router, health_router};
use crate::state::AppState;

/// 라우터 옵션.
#[derive(Clone, Default)]
pub struct RouterOptions {
    /// rate limit 비활성화
    pub rate_limit_disabled: bool,
    /// X-Forwarded-For / X-Real-IP 신뢰 여부
    pub trust_proxy_headers: bool,
    /// 허용 CORS origin (비어있으면 모든 origin)
    pub cors_origins: Vec<String>,
    /// `/metrics` 렌더링 핸들 (없으면 라우트 미등록)
    pub metrics_handle: Option<PrometheusHandle>,
}

/// 전체 라우터 생성.
pub fn create_app_router(state: Arc<AppState>, options: RouterOptions) -> Router {
    let api_router = if options.rate_limit_disabled {
        info!("Rate limiting DISABLED (RATE_LIMIT_DISABLED=true)");
        create_api_router().with_state(state.clone())
    } else {
        let limiter = state.rate_limiter.clone();
        info!(
            max_requests = limiter.config().max_requests,
            window_secs = limiter.config().window.as_secs(),
            trust_proxy_headers = options.trust_proxy_headers,
            "Rate limiting configured"
        );

        let rate_limit_state =
            RateLimitState::new(limiter).trust_proxy_headers(options.trust_proxy_headers);
        create_api_router()
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(
                rate_limit_state,
                rate_limit_middleware,
            ))
    };

    let mut router = Router::new()
        .merge(health_router().with_state(state))
        .merge(openapi_router())
        .merge(api_router);

    // 메트릭 라우터 (별도 상태, Rate Limit 제외)
    if let Some(handle) = options.metrics_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(handle),
        );
    }

    router
        .fallback(not_found_fallback)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&options.cors_origins))
}

/// CORS 레이어 생성.
///
/// origin 목록이 비어있으면 모든 origin을 허용합니다.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();

    let allow_origin = if parsed.is_empty() {
        if !origins.is_empty() {
            warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
        }
        AllowOrigin::any()
    } else {
        info!("CORS configured with {} allowed origins", parsed.len());
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
