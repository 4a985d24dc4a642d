//! OpenAPI 문서화 설정.
//!
//! utoipa로 REST API의 OpenAPI 3 문서를 생성하고 `/api-docs/openapi.json`에서 제공합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가
//!
//! 업스트림 본문을 그대로 전달하는 라우트는 응답 스키마를 선언하지 않습니다.

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::error::ErrorBody;
use crate::routes::{CacheUsage, ProviderStatus, RateLimitUsage, Readiness, ReadinessReport};

/// OpenAPI JSON 경로.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Coinlens API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coinlens API",
        description = r#"
# Coinlens 시세 프록시 API

CoinGecko 시세와 Contentful 콘텐츠를 캐싱하여 제공하는 프록시입니다.

- 응답은 60초간 캐시됩니다 (`CACHE_TTL_SECS`).
- `/api` 경로는 클라이언트 IP당 60초에 30회로 제한됩니다.
- 실패 응답은 `{ "error": ..., "details": ... }` 형식입니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:5000", description = "로컬 개발 서버"),
    ),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "market", description = "시세 - CoinGecko 프록시"),
        (name = "content", description = "콘텐츠 - 자산 설명 및 용어집")
    ),
    components(
        schemas(
            ErrorBody,
            ReadinessReport,
            Readiness,
            ProviderStatus,
            CacheUsage,
            RateLimitUsage,
        )
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::health::health_ready,
        crate::routes::market::top_assets,
        crate::routes::market::asset_detail,
        crate::routes::market::market_chart,
        crate::routes::content::asset_content,
        crate::routes::content::glossary,
    )
)]
pub struct ApiDoc;

/// OpenAPI JSON 라우터 생성.
pub fn openapi_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}
