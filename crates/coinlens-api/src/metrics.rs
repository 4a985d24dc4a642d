//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP, 캐시, 업스트림 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # Errors
///
/// 레코더가 이미 설치되어 있거나 버킷 설정이 잘못되면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        // HTTP 요청 지속 시간 히스토그램 버킷 설정
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭
// ============================================================================

/// HTTP 메트릭 공통 라벨.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpLabels {
    pub method: String,
    /// 라우트 템플릿 (`/api/crypto/{id}`) 또는 [`UNMATCHED_PATH`]
    pub route: String,
}

impl HttpLabels {
    pub fn new(method: impl Into<String>, route: Option<&str>) -> Self {
        Self {
            method: method.into(),
            route: route.unwrap_or(UNMATCHED_PATH).to_string(),
        }
    }
}

/// 요청 수신 기록 (`http_requests_total`).
pub fn record_http_request(labels: &HttpLabels) {
    counter!(
        "http_requests_total",
        "method" => labels.method.clone(),
        "path" => labels.route.clone()
    )
    .increment(1);
}

/// `http_requests_in_flight` 게이지 guard.
///
/// 생성 시 증가하고 drop 시 감소하므로, 클라이언트가 연결을 끊어
/// 요청 future가 중간에 버려져도 게이지가 원래 값으로 돌아옵니다.
#[derive(Debug)]
#[must_use = "게이지는 guard가 drop될 때 감소합니다"]
pub struct InFlightGuard(());

impl InFlightGuard {
    pub fn start() -> Self {
        gauge!("http_requests_in_flight").increment(1.0);
        Self(())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("http_requests_in_flight").decrement(1.0);
    }
}

/// 응답 완료 기록 (응답 카운터, 지속 시간).
pub fn record_http_completion(labels: &HttpLabels, status: u16, duration_secs: f64) {
    counter!(
        "http_responses_total",
        "method" => labels.method.clone(),
        "path" => labels.route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => labels.method.clone(),
        "path" => labels.route.clone()
    )
    .record(duration_secs);
}

// ============================================================================
// 프록시 메트릭 헬퍼 함수
// ============================================================================

/// 캐시 조회 결과 기록 (`hit` / `miss`).
pub fn record_cache_lookup(route: &'static str, hit: bool) {
    counter!(
        "proxy_cache_requests_total",
        "route" => route,
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

/// 업스트림 호출 결과 기록 (`success` 또는 에러 분류).
pub fn record_upstream_call(provider: &str, outcome: &'static str) {
    counter!(
        "upstream_requests_total",
        "provider" => provider.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 라우터에 매칭되지 않은 요청의 path 라벨.
///
/// 임의 경로가 라벨 카디널리티를 늘리지 않도록 하나로 묶습니다.
pub const UNMATCHED_PATH: &str = "unmatched";

/// 렌더링된 Prometheus 출력에서 `http_requests_in_flight` 값을 읽습니다.
#[cfg(test)]
pub(crate) fn in_flight(handle: &PrometheusHandle) -> f64 {
    handle
        .render()
        .lines()
        .find_map(|line| line.strip_prefix("http_requests_in_flight "))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0.0)
}
