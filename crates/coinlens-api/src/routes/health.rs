//! 헬스 체크 endpoint.
//!
//! rate limit 대상이 아니며 업스트림을 호출하지 않습니다.
//! 준비 상태는 설정된 제공자와 인메모리 저장소 크기로만 판단합니다.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

/// 준비 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// 모든 제공자 설정됨
    Ready,
    /// 시세 프록시는 동작하지만 콘텐츠 시스템이 없음
    Degraded,
}

/// 업스트림 제공자 상태.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProviderStatus {
    pub configured: bool,
    /// 제공자 이름 (설정된 경우)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl ProviderStatus {
    fn configured(name: &str) -> Self {
        Self {
            configured: true,
            provider: Some(name.to_string()),
        }
    }

    fn missing() -> Self {
        Self {
            configured: false,
            provider: None,
        }
    }
}

/// 캐시 사용량.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheUsage {
    /// 저장된 항목 수 (만료 후 아직 정리되지 않은 항목 포함)
    pub entries: usize,
    pub ttl_secs: u64,
}

/// rate limiter 사용량.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RateLimitUsage {
    /// 윈도우가 살아있는 클라이언트 수
    pub tracked_clients: usize,
    pub max_requests: u32,
    pub window_secs: u64,
}

/// `/health/ready` 응답.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadinessReport {
    pub status: Readiness,
    pub version: String,
    pub uptime_secs: i64,
    /// 확인 시각 (RFC 3339)
    pub checked_at: String,
    pub market_data: ProviderStatus,
    pub content: ProviderStatus,
    pub cache: CacheUsage,
    pub rate_limit: RateLimitUsage,
}

/// liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "프로세스가 요청을 처리할 수 있음")
    ),
    tag = "health"
)]
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// readiness probe. 콘텐츠 시스템이 없으면 `degraded`.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "제공자 설정 및 저장소 사용량", body = ReadinessReport)
    ),
    tag = "health"
)]
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Json<ReadinessReport> {
    let cache_entries = state.cache.len().await;
    let tracked_clients = state.rate_limiter.tracked_ips().await;
    let limits = state.rate_limiter.config();

    let content = state
        .content
        .as_ref()
        .map_or_else(ProviderStatus::missing, |c| ProviderStatus::configured(c.name()));

    Json(ReadinessReport {
        status: if content.configured {
            Readiness::Ready
        } else {
            Readiness::Degraded
        },
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        checked_at: chrono::Utc::now().to_rfc3339(),
        market_data: ProviderStatus::configured(state.market.name()),
        content,
        cache: CacheUsage {
            entries: cache_entries,
            ttl_secs: state.cache.ttl().as_secs(),
        },
        rate_limit: RateLimitUsage {
            tracked_clients,
            max_requests: limits.max_requests,
            window_secs: limits.window.as_secs(),
        },
    })
}

pub fn health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(health_ready))
}
