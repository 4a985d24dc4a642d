//! 콘텐츠 프록시 endpoint.
//!
//! 자산 설명 섹션과 용어집을 콘텐츠 시스템에서 가져옵니다.
//! 콘텐츠 시스템이 설정되지 않았으면 503으로 응답합니다.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::Value;
use std::sync::Arc;

use super::{cached_json, call_upstream};
use crate::cache::CacheKey;
use crate::error::{ApiError, ApiResult, ErrorBody, CONTENT_FETCH_ERROR};
use crate::extract::ApiPath;
use crate::state::AppState;

/// 자산 설명 콘텐츠.
///
/// GET /api/content/{id}
#[utoipa::path(
    get,
    path = "/api/content/{id}",
    params(
        ("id" = String, Path, description = "자산 ID (예: bitcoin)")
    ),
    responses(
        (status = 200, description = "cryptoId, symbol, sections, videoLinks, lastUpdated"),
        (status = 400, description = "경로를 해석할 수 없음", body = ErrorBody),
        (status = 404, description = "등록된 콘텐츠 없음", body = ErrorBody),
        (status = 500, description = "콘텐츠 시스템 실패", body = ErrorBody),
        (status = 503, description = "콘텐츠 시스템 미설정", body = ErrorBody)
    ),
    tag = "content"
)]
pub async fn asset_content(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let content = state.content.clone().ok_or(ApiError::ContentUnavailable)?;

    cached_json(&state, CacheKey::asset_content(id.as_str()), || async {
        let found = call_upstream(
            &state,
            content.name(),
            CONTENT_FETCH_ERROR,
            content.asset_content(&id),
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No content found for {}", id)))?;

        serde_json::to_value(found).map_err(|e| ApiError::Internal(e.to_string()))
    })
    .await
}

/// 용어집 (용어 알파벳순).
///
/// GET /api/glossary
#[utoipa::path(
    get,
    path = "/api/glossary",
    responses(
        (status = 200, description = "용어집 엔트리 배열"),
        (status = 500, description = "콘텐츠 시스템 실패", body = ErrorBody),
        (status = 503, description = "콘텐츠 시스템 미설정", body = ErrorBody)
    ),
    tag = "content"
)]
pub async fn glossary(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let content = state.content.clone().ok_or(ApiError::ContentUnavailable)?;

    cached_json(&state, CacheKey::Glossary, || async {
        let terms = call_upstream(
            &state,
            content.name(),
            CONTENT_FETCH_ERROR,
            content.glossary_terms(),
        )
        .await?;

        Ok(Value::Array(terms))
    })
    .await
}

/// 콘텐츠 라우터 생성.
pub fn content_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/content/{id}", get(asset_content))
        .route("/api/glossary", get(glossary))
}
