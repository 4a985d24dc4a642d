//! 시세 데이터 캐싱 프록시 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST 프록시 (CoinGecko 시세, Contentful 콘텐츠)
//! - TTL 응답 캐시
//! - 클라이언트 IP별 고정 윈도우 rate limiting
//! - 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`app`]: 전체 라우터 조립
//! - [`cache`]: 응답 캐시
//! - [`config`]: 환경변수 설정
//! - [`error`]: 에러 응답
//! - [`extract`]: JSON 거절 응답을 내는 요청 추출기
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어
//! - [`openapi`]: OpenAPI 문서

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use app::{create_app_router, RouterOptions};
pub use cache::{CacheKey, ResponseCache};
pub use config::{ApiConfig, ConfigError, LogFormat};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use metrics::setup_metrics_recorder;
pub use middleware::{metrics_layer, RateLimitConfig, RateLimiter};
pub use routes::*;
pub use state::AppState;

#[cfg(any(test, feature = "test-utils"))]
pub use state::create_test_state;
