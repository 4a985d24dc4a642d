//! 요청 단위 HTTP 메트릭 middleware.
//!
//! 라우트 레이어로 적용되므로 [`MatchedPath`]가 요청 확장에 들어 있습니다.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{record_http_completion, record_http_request, HttpLabels, InFlightGuard};

/// 요청 수, 응답 상태, 처리 시간, 동시 처리 수를 기록합니다.
///
/// path 라벨은 라우트 템플릿(`/api/crypto/{id}`)이며, 매칭되지 않은 요청은
/// 모두 `unmatched` 하나로 묶입니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let labels = HttpLabels::new(
        request.method().as_str(),
        request.extensions().get::<MatchedPath>().map(MatchedPath::as_str),
    );

    record_http_request(&labels);
    let _in_flight = InFlightGuard::start();
    let started = Instant::now();

    let response = next.run(request).await;

    record_http_completion(
        &labels,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::metrics::in_flight;

    fn app() -> Router {
        Router::new()
            .route("/api/crypto/{id}", get(|| async { "ok" }))
            .layer(middleware::from_fn(metrics_layer))
    }

    async fn status_of(uri: &str) -> StatusCode {
        app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_passes_response_through() {
        assert_eq!(status_of("/api/crypto/bitcoin").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unmatched_route_still_answers() {
        assert_eq!(status_of("/does-not-exist").await, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cancelled_request_leaves_no_in_flight() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let slow = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    "late"
                }),
            )
            .layer(middleware::from_fn(metrics_layer));

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();
                let outcome =
                    tokio::time::timeout(Duration::from_millis(50), slow.oneshot(request)).await;
                assert!(outcome.is_err());
            });
        });

        assert_eq!(in_flight(&handle), 0.0);
    }
}
