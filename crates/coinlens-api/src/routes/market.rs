//! 시세 프록시 endpoint.
//!
//! CoinGecko 응답을 변환 없이 그대로 전달합니다.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::Value;
use std::sync::Arc;
use utoipa::IntoParams;

use super::{cached_json, call_upstream};
use crate::cache::CacheKey;
use crate::error::{ApiResult, ErrorBody, CHART_FETCH_ERROR, FETCH_ERROR};
use crate::extract::ApiPath;
use crate::state::AppState;

/// 과거 시세 쿼리 파라미터.
///
/// 로컬에서 검증하지 않고 업스트림에 그대로 전달합니다.
/// 추출 규칙은 [`crate::extract`]에 있습니다.
#[derive(Debug, Clone, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MarketChartQuery {
    /// 기준 통화 (예: usd)
    pub vs_currency: Option<String>,
    /// 조회 기간 (일 수 또는 max)
    pub days: Option<String>,
}

/// 시가총액 상위 10개 자산.
///
/// GET /api/top-cryptos
#[utoipa::path(
    get,
    path = "/api/top-cryptos",
    responses(
        (status = 200, description = "업스트림 상위 자산 배열"),
        (status = 429, description = "요청 한도 초과", body = ErrorBody),
        (status = 500, description = "업스트림 실패", body = ErrorBody)
    ),
    tag = "market"
)]
pub async fn top_assets(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    cached_json(&state, CacheKey::TopAssets, || {
        call_upstream(
            &state,
            state.market.name(),
            FETCH_ERROR,
            state.market.top_assets(),
        )
    })
    .await
}

/// 자산 상세.
///
/// GET /api/crypto/{id}
#[utoipa::path(
    get,
    path = "/api/crypto/{id}",
    params(
        ("id" = String, Path, description = "자산 ID (예: bitcoin)")
    ),
    responses(
        (status = 200, description = "업스트림 자산 상세 객체"),
        (status = 400, description = "경로를 해석할 수 없음", body = ErrorBody),
        (status = 429, description = "요청 한도 초과", body = ErrorBody),
        (status = 500, description = "업스트림 실패", body = ErrorBody)
    ),
    tag = "market"
)]
pub async fn asset_detail(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    cached_json(&state, CacheKey::asset_detail(id.as_str()), || {
        call_upstream(
            &state,
            state.market.name(),
            FETCH_ERROR,
            state.market.asset_detail(&id),
        )
    })
    .await
}

/// 과거 가격 시계열.
///
/// GET /api/coins/{id}/market_chart?vs_currency=usd&days=30
#[utoipa::path(
    get,
    path = "/api/coins/{id}/market_chart",
    params(
        ("id" = String, Path, description = "자산 ID (예: bitcoin)"),
        MarketChartQuery
    ),
    responses(
        (status = 200, description = "업스트림 시세 객체 (prices, market_caps, total_volumes)"),
        (status = 400, description = "경로를 해석할 수 없음", body = ErrorBody),
        (status = 429, description = "요청 한도 초과", body = ErrorBody),
        (status = 500, description = "업스트림 실패", body = ErrorBody)
    ),
    tag = "market"
)]
pub async fn market_chart(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
    query: MarketChartQuery,
) -> ApiResult<Json<Value>> {
    let key = CacheKey::market_chart(id.as_str(), query.vs_currency.clone(), query.days.clone());

    cached_json(&state, key, || {
        call_upstream(
            &state,
            state.market.name(),
            CHART_FETCH_ERROR,
            state.market.market_chart(
                &id,
                query.vs_currency.as_deref(),
                query.days.as_deref(),
            ),
        )
    })
    .await
}

/// 시세 라우터 생성.
pub fn market_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/top-cryptos", get(top_assets))
        .route("/api/crypto/{id}", get(asset_detail))
        .route("/api/coins/{id}/market_chart", get(market_chart))
}
